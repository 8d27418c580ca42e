//! Calibration batch: classify, score and correct every stored food.
//!
//! One sequential pass, one database round-trip per updated record, no
//! transaction spanning the batch. A bad record is logged and counted; only a
//! failure to load the record set aborts the run.

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::category::{classify, Category};
use super::ranges;
use super::scoring::{record_accuracy, round3};
use super::units::{self, FieldChange};
use crate::foods::repo::FoodStore;
use crate::foods::repo_types::{FoodRecord, FoodUpdate, NewAuditEntry};

pub const CALIBRATION_ACTION: &str = "scientific_calibration";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOptions {
    pub limit: Option<i64>,
    /// Records whose initial accuracy is below this are outliers and always persisted.
    pub outlier_threshold: f64,
    /// Highest accuracy score this run may write.
    pub accuracy_ceiling: f64,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            limit: None,
            outlier_threshold: 0.8,
            accuracy_ceiling: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    Loading,
    PerRecord,
    Summarizing,
    Done,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalibrationError {
    #[error("{field} has invalid value {value}")]
    InvalidValue { field: &'static str, value: f64 },
}

/// What calibration decided for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPlan {
    pub category: Category,
    /// `None` when the category has no range table.
    pub initial_accuracy: Option<f64>,
    pub final_accuracy: Option<f64>,
    pub changes: Vec<FieldChange>,
    pub update: Option<FoodUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSummary {
    pub total_foods: usize,
    pub calibrated: usize,
    pub updated: usize,
    pub outliers: usize,
    pub skipped: usize,
    pub failed: usize,
    pub average_accuracy: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

/// Score to store: never below the prior score, never above `ceiling`, always in `[0, 1]`.
pub fn next_accuracy(prior: Option<f64>, scored: f64, ceiling: f64) -> f64 {
    let prior = prior.filter(|p| p.is_finite()).unwrap_or(0.0);
    prior.max(scored.min(ceiling)).clamp(0.0, 1.0)
}

fn validate(record: &FoodRecord) -> Result<(), CalibrationError> {
    match record
        .nutrients
        .present()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
    {
        Some((n, value)) => Err(CalibrationError::InvalidValue {
            field: n.column(),
            value,
        }),
        None => Ok(()),
    }
}

/// Classify → score → correct → rescore for one record. Pure.
pub fn plan_record(
    record: &FoodRecord,
    opts: &CalibrationOptions,
) -> Result<RecordPlan, CalibrationError> {
    validate(record)?;

    let category = classify(record.display_name());
    let ranges = ranges::for_category(category);
    let initial_accuracy = ranges.map(|r| round3(record_accuracy(&record.nutrients, r)));

    let (corrected, changes) = units::correct_values(&record.nutrients, |n| {
        ranges.and_then(|r| r.get(n)).unwrap_or_else(|| n.band())
    });
    let final_accuracy = ranges.map(|r| round3(record_accuracy(&corrected, r)));

    let category_changed = record.stored_category() != Some(category);
    let outlier = initial_accuracy.is_some_and(|a| a < opts.outlier_threshold);

    let update = (!changes.is_empty() || category_changed || outlier).then(|| FoodUpdate {
        id: record.id,
        category: Some(category),
        accuracy_score: final_accuracy
            .map(|a| next_accuracy(record.accuracy_score, a, opts.accuracy_ceiling)),
        source: None,
        nutrients: changes.iter().map(|c| (c.nutrient, c.new_value)).collect(),
        audit: NewAuditEntry {
            food_id: Some(record.id),
            action: CALIBRATION_ACTION,
            details: json!({
                "category": category,
                "previousCategory": record.category,
                "accuracyBefore": initial_accuracy,
                "accuracyAfter": final_accuracy,
                "changes": changes,
            }),
        },
    });

    Ok(RecordPlan {
        category,
        initial_accuracy,
        final_accuracy,
        changes,
        update,
    })
}

fn enter(phase: CalibrationPhase) {
    info!(?phase, "calibration phase");
}

/// Runs one calibration pass over the store.
pub async fn run_calibration(
    store: &dyn FoodStore,
    opts: &CalibrationOptions,
) -> anyhow::Result<CalibrationSummary> {
    enter(CalibrationPhase::Idle);
    info!(limit = ?opts.limit, "scientific calibration started");

    enter(CalibrationPhase::Loading);
    let records = store.list_foods(opts.limit).await?;

    enter(CalibrationPhase::PerRecord);
    let mut calibrated = 0;
    let mut updated = 0;
    let mut outliers = 0;
    let mut skipped = 0;
    let mut failed = 0;
    let mut accuracy_sum = 0.0;

    for record in &records {
        let plan = match plan_record(record, opts) {
            Ok(p) => p,
            Err(e) => {
                warn!(food_id = record.id, error = %e, "food skipped");
                failed += 1;
                continue;
            }
        };

        match (plan.initial_accuracy, plan.final_accuracy) {
            (Some(initial), Some(final_accuracy)) => {
                calibrated += 1;
                accuracy_sum += final_accuracy;
                if initial < opts.outlier_threshold {
                    outliers += 1;
                }
            }
            _ => skipped += 1,
        }

        debug!(
            food_id = record.id,
            category = %plan.category,
            accuracy = ?plan.final_accuracy,
            changes = plan.changes.len(),
            "food calibrated"
        );

        if let Some(update) = &plan.update {
            match store.apply_update(update).await {
                Ok(()) => updated += 1,
                Err(e) => {
                    warn!(food_id = record.id, error = ?e, "calibration write failed");
                    failed += 1;
                }
            }
        }
    }

    enter(CalibrationPhase::Summarizing);
    let average_accuracy = if calibrated > 0 {
        round3(accuracy_sum / calibrated as f64)
    } else {
        0.0
    };
    let summary = CalibrationSummary {
        total_foods: records.len(),
        calibrated,
        updated,
        outliers,
        skipped,
        failed,
        average_accuracy,
        date: OffsetDateTime::now_utc(),
    };

    enter(CalibrationPhase::Done);
    info!(
        total = summary.total_foods,
        calibrated = summary.calibrated,
        updated = summary.updated,
        outliers = summary.outliers,
        failed = summary.failed,
        average_accuracy = summary.average_accuracy,
        "scientific calibration finished"
    );
    Ok(summary)
}
