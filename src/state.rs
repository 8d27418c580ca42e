use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::foods::repo::{FoodStore, PgFoodStore};
use crate::foods::services::SuggestionCache;
use crate::scene::classifier::{OpenAiSceneClassifier, SceneClassifier};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub foods: Arc<dyn FoodStore>,
    pub suggestions: Arc<SuggestionCache>,
    /// `None` when no classifier is configured; scene detection then falls back.
    pub scene: Option<Arc<dyn SceneClassifier>>,
}

impl AppState {
    /// Connects to Postgres and wires the production services.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, PgPool)> {
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        let scene = OpenAiSceneClassifier::from_config(&config.scene)
            .map(|c| Arc::new(c) as Arc<dyn SceneClassifier>);
        if scene.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; scene detection always answers the fallback");
        }

        let foods = Arc::new(PgFoodStore::new(db.clone())) as Arc<dyn FoodStore>;
        Ok((Self::from_parts(Arc::new(config), foods, scene), db))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        foods: Arc<dyn FoodStore>,
        scene: Option<Arc<dyn SceneClassifier>>,
    ) -> Self {
        let suggestions = Arc::new(TtlCache::new(config.cache.capacity, config.cache.ttl));
        Self {
            config,
            foods,
            suggestions,
            scene,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(Arc::new(crate::foods::memory::MemoryFoodStore::default()))
    }

    #[cfg(test)]
    pub fn fake_with(store: Arc<crate::foods::memory::MemoryFoodStore>) -> Self {
        Self::from_parts(Arc::new(AppConfig::local()), store, None)
    }
}
