use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::units::{self, FieldChange};
use crate::foods::repo::FoodStore;
use crate::foods::repo_types::{FoodRecord, FoodUpdate, NewAuditEntry};

pub const NORMALIZE_ACTION: &str = "unit_normalization";

#[derive(Debug, Clone, Serialize)]
pub struct NormalizationLog {
    pub id: i32,
    pub food: String,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizationSummary {
    pub success: bool,
    pub updated: usize,
    pub failed: usize,
    pub logs: Vec<NormalizationLog>,
}

/// Unit fixes for every field against its category-independent band.
pub fn plan_normalization(record: &FoodRecord) -> Option<(FoodUpdate, Vec<FieldChange>)> {
    let (_, changes) = units::correct_values(&record.nutrients, |n| n.band());
    if changes.is_empty() {
        return None;
    }
    let update = FoodUpdate {
        id: record.id,
        category: None,
        accuracy_score: None,
        source: None,
        nutrients: changes.iter().map(|c| (c.nutrient, c.new_value)).collect(),
        audit: NewAuditEntry {
            food_id: Some(record.id),
            action: NORMALIZE_ACTION,
            details: json!({ "changes": changes }),
        },
    };
    Some((update, changes))
}

pub async fn run_normalization(
    store: &dyn FoodStore,
    limit: Option<i64>,
) -> anyhow::Result<NormalizationSummary> {
    let records = store.list_foods(limit).await?;
    let mut logs = Vec::new();
    let mut failed = 0;

    for record in &records {
        let Some((update, changes)) = plan_normalization(record) else {
            continue;
        };
        match store.apply_update(&update).await {
            Ok(()) => logs.push(NormalizationLog {
                id: record.id,
                food: record.display_name().to_string(),
                changes,
            }),
            Err(e) => {
                warn!(food_id = record.id, error = ?e, "normalization write failed");
                failed += 1;
            }
        }
    }

    info!(scanned = records.len(), updated = logs.len(), failed, "unit normalization finished");
    Ok(NormalizationSummary {
        success: true,
        updated: logs.len(),
        failed,
        logs,
    })
}
