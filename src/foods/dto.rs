use serde::{Deserialize, Serialize};

use super::repo_types::FoodRecord;

#[derive(Debug, Deserialize)]
pub struct SearchFoodRequest {
    #[serde(default)]
    pub food: String,
}

#[derive(Debug, Serialize)]
pub struct SearchFoodResponse {
    pub count: usize,
    pub results: Vec<FoodRecord>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeItemsRequest {
    #[serde(default)]
    pub ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutrientFillResponse {
    pub success: bool,
    pub filled_count: usize,
}
