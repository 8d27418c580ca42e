use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::normalize::{run_normalization, NormalizationSummary};
use super::runner::{run_calibration, CalibrationOptions, CalibrationSummary};
use crate::error::AppError;
use crate::foods::repo::FoodStore;
use crate::foods::repo_types::NewAuditEntry;
use crate::state::AppState;

pub const BATCH_ACTION: &str = "scientific_batch";
const DEFAULT_NORMALIZE_LIMIT: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/scientific-calibrate", post(scientific_calibrate))
        .route("/normalize-units", post(normalize_units))
        .route("/scientific-run", post(scientific_run))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitRequest {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub prev_accuracy: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub success: bool,
    pub batch_id: Uuid,
    pub normalization: NormalizationSummary,
    pub calibration: CalibrationSummary,
    /// Average accuracy gain over `prevAccuracy`, in percentage points.
    pub improvement: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

fn options(state: &AppState, limit: Option<i64>) -> CalibrationOptions {
    CalibrationOptions {
        limit,
        outlier_threshold: state.config.calibration.outlier_threshold,
        accuracy_ceiling: state.config.calibration.accuracy_ceiling,
    }
}

fn check_limit(limit: Option<i64>) -> Result<Option<i64>, AppError> {
    match limit {
        Some(l) if l < 0 => Err(AppError::BadRequest("limit must not be negative".into())),
        other => Ok(other),
    }
}

/// Body is optional: an empty POST takes the defaults, a malformed one is rejected.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))
}

/// Cached search results may hold values a batch just rewrote.
fn invalidate_suggestions(state: &AppState, updated: usize) {
    if updated > 0 {
        state.suggestions.clear();
    }
}

#[instrument(skip(state, body))]
pub async fn scientific_calibrate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CalibrationSummary>, AppError> {
    let req: LimitRequest = parse_body(&body)?;
    let limit = check_limit(req.limit)?;
    let summary = run_calibration(state.foods.as_ref(), &options(&state, limit)).await?;
    invalidate_suggestions(&state, summary.updated);
    Ok(Json(summary))
}

#[instrument(skip(state, body))]
pub async fn normalize_units(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<NormalizationSummary>, AppError> {
    let req: LimitRequest = parse_body(&body)?;
    let limit = check_limit(req.limit)?.unwrap_or(DEFAULT_NORMALIZE_LIMIT);
    let summary = run_normalization(state.foods.as_ref(), Some(limit)).await?;
    invalidate_suggestions(&state, summary.updated);
    Ok(Json(summary))
}

#[instrument(skip(state, body))]
pub async fn scientific_run(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RunResponse>, AppError> {
    let req: RunRequest = parse_body(&body)?;
    let limit = check_limit(req.limit)?;
    let batch_id = Uuid::new_v4();
    info!(%batch_id, ?limit, "scientific run started");

    let normalization = run_normalization(state.foods.as_ref(), limit).await?;
    let calibration = run_calibration(state.foods.as_ref(), &options(&state, limit)).await?;
    invalidate_suggestions(&state, normalization.updated + calibration.updated);
    let gain = (calibration.average_accuracy - req.prev_accuracy.unwrap_or(0.0)) * 100.0;
    let improvement = (gain * 100.0).round() / 100.0;

    state
        .foods
        .append_audit(&NewAuditEntry {
            food_id: None,
            action: BATCH_ACTION,
            details: json!({
                "batchId": batch_id,
                "normalization": { "updated": normalization.updated, "failed": normalization.failed },
                "calibration": calibration,
                "improvement": improvement,
            }),
        })
        .await?;

    Ok(Json(RunResponse {
        success: true,
        batch_id,
        normalization,
        calibration,
        improvement,
        date: OffsetDateTime::now_utc(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::foods::memory::{food, MemoryFoodStore};
    use crate::nutrients::{Nutrient, NutrientValues};
    use crate::state::AppState;

    fn seeded() -> Arc<MemoryFoodStore> {
        Arc::new(MemoryFoodStore::with_foods(vec![
            food(
                1,
                "Olive oil",
                NutrientValues::default()
                    .with(Nutrient::Kcal, 9.0)
                    .with(Nutrient::Protein, 0.0)
                    .with(Nutrient::Fat, 100.0)
                    .with(Nutrient::Carbs, 0.0),
            ),
            food(
                2,
                "Salmon fillet",
                NutrientValues::default()
                    .with(Nutrient::Kcal, 208.0)
                    .with(Nutrient::Protein, 20.0)
                    .with(Nutrient::Fat, 8.0)
                    .with(Nutrient::Carbs, 0.0)
                    .with(Nutrient::VitaminD, 11_000.0),
            ),
        ]))
    }

    async fn post(store: Arc<MemoryFoodStore>, uri: &str, body: &str) -> (StatusCode, Value) {
        call(&build_app(AppState::fake_with(store)), uri, body).await
    }

    async fn call(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let res = app
            .clone()
            .oneshot(
                Request::post(uri)
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
    async fn calibrate_returns_summary() {
        let store = seeded();
        let (status, json) = post(store.clone(), "/api/scientific-calibrate", "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalFoods"], 2);
        assert_eq!(json["outliers"], 1);
        assert!(json["date"].is_string());
        assert_eq!(store.food(1).unwrap().nutrients.get(Nutrient::Kcal), Some(900.0));
    }

    #[tokio::test]
    async fn calibrate_honours_limit() {
        let (status, json) = post(seeded(), "/api/scientific-calibrate", r#"{"limit":1}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalFoods"], 1);
    }

    #[tokio::test]
    async fn negative_limit_is_rejected() {
        let (status, json) = post(seeded(), "/api/scientific-calibrate", r#"{"limit":-1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn empty_body_takes_the_defaults() {
        let app = build_app(AppState::fake_with(seeded()));
        let res = app
            .oneshot(Request::post("/api/scientific-calibrate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_limit_is_rejected_without_writing() {
        for (uri, body) in [
            ("/api/scientific-calibrate", r#"{"limit":"1"}"#),
            ("/api/scientific-calibrate", r#"{"limit":1.5}"#),
            ("/api/normalize-units", r#"{"limit":"1"}"#),
            ("/api/scientific-run", r#"{"limit":"all"}"#),
            ("/api/scientific-run", "not json"),
        ] {
            let store = seeded();
            let (status, json) = post(store.clone(), uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
            assert!(json["error"].is_string());
            assert_eq!(store.food(1).unwrap().nutrients.get(Nutrient::Kcal), Some(9.0));
            assert_eq!(store.food(2).unwrap().nutrients.get(Nutrient::VitaminD), Some(11_000.0));
            assert!(store.audit_entries().is_empty());
        }
    }

    #[tokio::test]
    async fn calibration_clears_cached_search_results() {
        let app = build_app(AppState::fake_with(seeded()));
        let (_, json) = call(&app, "/api/search-food", r#"{"food":"olive"}"#).await;
        assert_eq!(json["results"][0]["kcal"], 9.0);

        let (status, _) = call(&app, "/api/scientific-calibrate", "{}").await;
        assert_eq!(status, StatusCode::OK);

        let (_, json) = call(&app, "/api/search-food", r#"{"food":"olive"}"#).await;
        assert_eq!(json["results"][0]["kcal"], 900.0);
    }

    #[tokio::test]
    async fn load_failure_is_a_generic_500() {
        let store = seeded();
        store.fail_listing();
        let (status, json) = post(store, "/api/scientific-calibrate", "{}").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn normalize_logs_changes() {
        let store = seeded();
        let (status, json) = post(store.clone(), "/api/normalize-units", "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["updated"], 1);
        assert_eq!(json["logs"][0]["food"], "Salmon fillet");
        assert_eq!(json["logs"][0]["changes"][0]["field"], "vitamin_d");
        assert_eq!(store.food(2).unwrap().nutrients.get(Nutrient::VitaminD), Some(11.0));
    }

    #[tokio::test]
    async fn scientific_run_records_a_batch_row() {
        let store = seeded();
        let (status, json) = post(store.clone(), "/api/scientific-run", r#"{"prevAccuracy":0.5}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert!(uuid::Uuid::parse_str(json["batchId"].as_str().unwrap()).is_ok());
        assert_eq!(json["normalization"]["updated"], 1);
        assert_eq!(json["calibration"]["totalFoods"], 2);
        assert_eq!(json["improvement"], 50.0);

        let batch: Vec<_> = store
            .audit_entries()
            .into_iter()
            .filter(|e| e.food_id.is_none())
            .collect();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].action, super::BATCH_ACTION);
    }
}
