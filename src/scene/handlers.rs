use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{detect_scene, SceneType};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/detect-scene", post(detect_scene_type))
}

#[derive(Debug, Deserialize)]
pub struct DetectSceneRequest {
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct DetectSceneResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub scene: SceneType,
}

#[instrument(skip(state, body))]
pub async fn detect_scene_type(
    State(state): State<AppState>,
    Json(body): Json<DetectSceneRequest>,
) -> Result<Json<DetectSceneResponse>, AppError> {
    if body.image.trim().is_empty() {
        return Err(AppError::BadRequest("No image".into()));
    }
    let scene = detect_scene(state.scene.as_ref(), &body.image, state.config.scene.fallback).await;
    info!(?scene, "scene detected");
    Ok(Json(DetectSceneResponse {
        success: true,
        scene,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::scene::tests::StaticClassifier;
    use crate::scene::SceneType;
    use crate::state::AppState;

    async fn detect(state: AppState, body: &str) -> (StatusCode, Value) {
        let res = build_app(state)
            .oneshot(
                Request::post("/api/detect-scene")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn classifies_product_photos() {
        let mut state = AppState::fake();
        state.scene = Some(Arc::new(StaticClassifier {
            scene: Some(SceneType::Product),
            delay: Duration::ZERO,
        }));
        let (status, json) = detect(state, r#"{"image":"https://cdn.test/x.jpg"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "success": true, "type": "product" }));
    }

    #[tokio::test]
    async fn without_classifier_answers_meal() {
        let (status, json) = detect(AppState::fake(), r#"{"image":"data:image/jpeg;base64,AA"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "meal");
    }

    #[tokio::test]
    async fn missing_image_is_rejected() {
        let (status, _) = detect(AppState::fake(), "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
