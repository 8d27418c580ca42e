use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::repo::FoodStore;
use super::repo_types::{FoodRecord, FoodUpdate, NewAuditEntry};
use crate::cache::TtlCache;
use crate::calibration::category::{classify, Category};
use crate::matcher::find_best_match;
use crate::nutrients::Nutrient;

pub const SEARCH_LIMIT: i64 = 10;
pub const FILL_ACTION: &str = "nutrient_fill";
pub const FILL_SOURCE: &str = "FitAI_avg";
const FILL_PEERS: usize = 20;
const OUTLIER_SAMPLES: usize = 5;

pub type SuggestionCache = TtlCache<String, Vec<FoodRecord>>;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// --- lookup ---

/// Name search: substring match first, fuzzy match over every name when that
/// finds nothing. Results are cached per lower-cased query.
pub async fn search_foods(
    store: &dyn FoodStore,
    cache: &SuggestionCache,
    query: &str,
) -> anyhow::Result<Vec<FoodRecord>> {
    let key = query.trim().to_lowercase();
    if let Some(hit) = cache.get(&key) {
        debug!(query = %key, "suggestion cache hit");
        return Ok(hit);
    }

    let mut found = store.search_by_name(&key, SEARCH_LIMIT).await?;
    if found.is_empty() {
        let all = store.list_foods(None).await?;
        if let Some(best) = find_best_match(&key, &all, |f| f.display_name()) {
            found.push(best.clone());
        }
    }

    if !found.is_empty() {
        cache.insert(key, found.clone());
    }
    Ok(found)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MacroTotals {
    pub kcal: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    pub fn of(foods: &[FoodRecord]) -> Self {
        let sum = |n: Nutrient| {
            let total: f64 = foods.iter().filter_map(|f| f.nutrients.get(n)).sum();
            round_to(total, 1)
        };
        Self {
            kcal: sum(Nutrient::Kcal),
            protein: sum(Nutrient::Protein),
            carbs: sum(Nutrient::Carbs),
            fat: sum(Nutrient::Fat),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemAnalysis {
    pub items: Vec<FoodRecord>,
    pub totals: MacroTotals,
    pub missing: Vec<String>,
}

pub async fn analyze_items(
    store: &dyn FoodStore,
    cache: &SuggestionCache,
    ingredients: &[String],
) -> anyhow::Result<ItemAnalysis> {
    let mut items = Vec::new();
    let mut missing = Vec::new();
    for name in ingredients.iter().filter(|n| !n.trim().is_empty()) {
        match search_foods(store, cache, name).await?.into_iter().next() {
            Some(food) => items.push(food),
            None => missing.push(name.clone()),
        }
    }
    let totals = MacroTotals::of(&items);
    Ok(ItemAnalysis {
        items,
        totals,
        missing,
    })
}

// --- verification report ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSample {
    pub id: i32,
    pub food: String,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyReport {
    pub total_foods: usize,
    pub macro_accuracy: f64,
    pub micro_accuracy: f64,
    pub overall_accuracy: f64,
    pub outlier_count: usize,
    pub outlier_samples: Vec<OutlierSample>,
}

fn percent(ok: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round_to(ok as f64 / total as f64 * 100.0, 1)
    }
}

/// Share of positive values inside their magnitude band, split by macro/micro.
pub fn accuracy_report(foods: &[FoodRecord]) -> AccuracyReport {
    let (mut macro_ok, mut macro_total) = (0, 0);
    let (mut micro_ok, mut micro_total) = (0, 0);
    let mut outliers = Vec::new();

    for food in foods {
        for (n, value) in food.nutrients.present().filter(|(_, v)| *v > 0.0) {
            let inside = n.band().contains(value);
            let (ok, total) = if n.is_macro() {
                (&mut macro_ok, &mut macro_total)
            } else {
                (&mut micro_ok, &mut micro_total)
            };
            *total += 1;
            if inside {
                *ok += 1;
            } else {
                outliers.push(OutlierSample {
                    id: food.id,
                    food: food.display_name().to_string(),
                    issue: format!("{}={}", n.column(), value),
                });
            }
        }
    }

    let macro_accuracy = percent(macro_ok, macro_total);
    let micro_accuracy = percent(micro_ok, micro_total);
    let outlier_count = outliers.len();
    outliers.truncate(OUTLIER_SAMPLES);

    AccuracyReport {
        total_foods: foods.len(),
        macro_accuracy,
        micro_accuracy,
        overall_accuracy: round_to((macro_accuracy + micro_accuracy) / 2.0, 1),
        outlier_count,
        outlier_samples: outliers,
    }
}

pub async fn verify_accuracy(store: &dyn FoodStore) -> anyhow::Result<AccuracyReport> {
    let foods = store.list_foods(None).await?;
    let report = accuracy_report(&foods);
    info!(
        total = report.total_foods,
        overall = report.overall_accuracy,
        outliers = report.outlier_count,
        "accuracy verification finished"
    );
    Ok(report)
}

// --- nutrient fill ---

/// Peer-average fill for one food, or `None` when nothing can be filled.
///
/// Peers are up to 20 other foods of the same category; each missing field
/// takes the mean of the peers' positive values, rounded to two decimals.
pub fn plan_fill(food: &FoodRecord, category: Category, peers: &[&FoodRecord]) -> Option<FoodUpdate> {
    if category == Category::Unknown {
        return None;
    }
    let peers: Vec<&FoodRecord> = peers
        .iter()
        .copied()
        .filter(|p| p.id != food.id)
        .take(FILL_PEERS)
        .collect();

    let filled: Vec<(Nutrient, f64)> = food
        .nutrients
        .missing()
        .into_iter()
        .filter_map(|n| {
            let values: Vec<f64> = peers
                .iter()
                .filter_map(|p| p.nutrients.get(n))
                .filter(|v| v.is_finite() && *v > 0.0)
                .collect();
            if values.is_empty() {
                return None;
            }
            let avg = values.iter().sum::<f64>() / values.len() as f64;
            Some((n, round_to(avg, 2)))
        })
        .collect();

    if filled.is_empty() {
        return None;
    }

    let fields: Vec<&str> = filled.iter().map(|(n, _)| n.column()).collect();
    Some(FoodUpdate {
        id: food.id,
        category: None,
        accuracy_score: None,
        source: Some(FILL_SOURCE),
        audit: NewAuditEntry {
            food_id: Some(food.id),
            action: FILL_ACTION,
            details: json!({ "category": category, "filledFields": fields, "peers": peers.len() }),
        },
        nutrients: filled,
    })
}

pub async fn nutrient_fill(store: &dyn FoodStore) -> anyhow::Result<usize> {
    let foods = store.list_foods(None).await.context("load foods for fill")?;
    let categories: Vec<Category> = foods.iter().map(|f| classify(f.display_name())).collect();

    let mut filled = 0;
    for (food, category) in foods.iter().zip(&categories) {
        let peers: Vec<&FoodRecord> = foods
            .iter()
            .zip(&categories)
            .filter(|(_, c)| *c == category)
            .map(|(f, _)| f)
            .collect();
        let Some(update) = plan_fill(food, *category, &peers) else {
            continue;
        };
        match store.apply_update(&update).await {
            Ok(()) => filled += 1,
            Err(e) => warn!(food_id = food.id, error = ?e, "nutrient fill write failed"),
        }
    }

    info!(scanned = foods.len(), filled, "nutrient fill finished");
    Ok(filled)
}
