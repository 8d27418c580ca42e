use std::sync::Arc;
use std::time::Duration;

mod app;
mod cache;
mod calibration;
mod config;
mod error;
mod foods;
mod matcher;
mod nutrients;
mod scene;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nutri_calibrate=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let (host, port) = (config.host.clone(), config.port);
    let (app_state, db) = AppState::init(config).await?;

    sqlx::migrate!("./migrations").run(&db).await?;

    spawn_cache_purge(app_state.suggestions.clone());

    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}

/// Periodically drops expired search suggestions.
fn spawn_cache_purge(cache: Arc<foods::services::SuggestionCache>) {
    let every = cache.ttl().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            cache.purge_expired();
        }
    });
}
