use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::repo::FoodStore;
use super::dto::{AnalyzeItemsRequest, NutrientFillResponse, SearchFoodRequest, SearchFoodResponse};
use super::repo_types::{AuditLogEntry, FoodRecord};
use super::services::{self, AccuracyReport, ItemAnalysis};
use crate::error::AppError;
use crate::state::AppState;

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/foods/:id", get(get_food))
        .route("/foods/:id/audit", get(get_food_audit))
        .route("/verify-accuracy", get(verify_accuracy))
        .route("/search-food", post(search_food))
        .route("/analyze-items", post(analyze_items))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/nutrient-fill", post(nutrient_fill))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FoodRecord>, AppError> {
    state
        .foods
        .get_food(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Food not found".into()))
}

#[instrument(skip(state))]
pub async fn get_food_audit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    if state.foods.get_food(id).await?.is_none() {
        return Err(AppError::NotFound("Food not found".into()));
    }
    Ok(Json(state.foods.list_audit(id).await?))
}

#[instrument(skip(state, body))]
pub async fn search_food(
    State(state): State<AppState>,
    Json(body): Json<SearchFoodRequest>,
) -> Result<Json<SearchFoodResponse>, AppError> {
    if body.food.trim().is_empty() {
        return Err(AppError::BadRequest("Missing food name".into()));
    }
    let results =
        services::search_foods(state.foods.as_ref(), &state.suggestions, &body.food).await?;
    if results.is_empty() {
        return Err(AppError::NotFound("No foods found".into()));
    }
    Ok(Json(SearchFoodResponse {
        count: results.len(),
        results,
    }))
}

#[instrument(skip(state, body))]
pub async fn analyze_items(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeItemsRequest>,
) -> Result<Json<ItemAnalysis>, AppError> {
    if body.ingredients.iter().all(|i| i.trim().is_empty()) {
        return Err(AppError::BadRequest("ingredients must be non-empty".into()));
    }
    let analysis =
        services::analyze_items(state.foods.as_ref(), &state.suggestions, &body.ingredients)
            .await?;
    Ok(Json(analysis))
}

#[instrument(skip(state))]
pub async fn verify_accuracy(
    State(state): State<AppState>,
) -> Result<Json<AccuracyReport>, AppError> {
    Ok(Json(services::verify_accuracy(state.foods.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn nutrient_fill(
    State(state): State<AppState>,
) -> Result<Json<NutrientFillResponse>, AppError> {
    let filled_count = services::nutrient_fill(state.foods.as_ref()).await?;
    if filled_count > 0 {
        state.suggestions.clear();
    }
    Ok(Json(NutrientFillResponse {
        success: true,
        filled_count,
    }))
}
