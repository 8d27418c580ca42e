use super::ranges::CategoryRanges;
use crate::nutrients::{Band, Nutrient, NutrientValues};

/// Confidence in `[0, 1]` that `value` is plausible for `range`.
///
/// Inside the range scores 1; outside decays linearly and reaches 0 one range
/// width past the nearest boundary. Missing or NaN values score 0.
pub fn score(value: Option<f64>, range: Band) -> f64 {
    let Some(value) = value.filter(|v| !v.is_nan()) else {
        return 0.0;
    };
    if range.contains(value) {
        return 1.0;
    }
    let width = range.width();
    if width <= 0.0 {
        return 0.0;
    }
    let distance = if value < range.min {
        range.min - value
    } else {
        value - range.max
    };
    (1.0 - distance / width).clamp(0.0, 1.0)
}

/// Unweighted mean of the macro scores that have a range; 0 when none do.
pub fn record_accuracy(values: &NutrientValues, ranges: &CategoryRanges) -> f64 {
    let scores: Vec<f64> = Nutrient::MACROS
        .into_iter()
        .filter_map(|n| ranges.get(n).map(|band| score(values.get(n), band)))
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.clamp(0.0, 1.0)
}

/// Rounds to three decimals, as accuracy scores are stored and reported.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
