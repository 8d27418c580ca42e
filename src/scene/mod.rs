pub mod classifier;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde::Serialize;
use tracing::{info, warn};

use crate::state::AppState;
use classifier::SceneClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneType {
    Meal,
    Product,
}

/// Answer used when the classifier is missing, slow or failing.
pub const FALLBACK_SCENE: SceneType = SceneType::Meal;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::routes())
}

/// Races the classifier against `fallback`; whichever finishes first decides.
pub async fn detect_scene(
    classifier: Option<&Arc<dyn SceneClassifier>>,
    image: &str,
    fallback: Duration,
) -> SceneType {
    let Some(classifier) = classifier else {
        return FALLBACK_SCENE;
    };

    tokio::select! {
        res = classifier.classify(image) => match res {
            Ok(scene) => scene,
            Err(e) => {
                warn!(error = ?e, "scene classification failed");
                FALLBACK_SCENE
            }
        },
        _ = tokio::time::sleep(fallback) => {
            info!(fallback_ms = fallback.as_millis() as u64, "scene classification timed out");
            FALLBACK_SCENE
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers `scene` after `delay`, or fails when `scene` is `None`.
    pub struct StaticClassifier {
        pub scene: Option<SceneType>,
        pub delay: Duration,
    }

    #[async_trait]
    impl SceneClassifier for StaticClassifier {
        async fn classify(&self, _image: &str) -> anyhow::Result<SceneType> {
            tokio::time::sleep(self.delay).await;
            self.scene.ok_or_else(|| anyhow::anyhow!("model unavailable"))
        }
    }

    fn classifier(scene: Option<SceneType>, delay_ms: u64) -> Arc<dyn SceneClassifier> {
        Arc::new(StaticClassifier {
            scene,
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test]
    async fn fast_classifier_wins() {
        let c = classifier(Some(SceneType::Product), 0);
        let scene = detect_scene(Some(&c), "data:image/png;base64,AA", Duration::from_secs(5)).await;
        assert_eq!(scene, SceneType::Product);
    }

    #[tokio::test]
    async fn slow_classifier_loses_to_fallback() {
        let c = classifier(Some(SceneType::Product), 10_000);
        let scene = detect_scene(Some(&c), "x", Duration::from_millis(20)).await;
        assert_eq!(scene, FALLBACK_SCENE);
    }

    #[tokio::test]
    async fn failing_classifier_falls_back() {
        let c = classifier(None, 0);
        assert_eq!(detect_scene(Some(&c), "x", Duration::from_secs(5)).await, FALLBACK_SCENE);
    }

    #[tokio::test]
    async fn no_classifier_falls_back() {
        assert_eq!(detect_scene(None, "x", Duration::from_secs(5)).await, FALLBACK_SCENE);
    }
}
