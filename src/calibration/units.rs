//! Order-of-magnitude correction for nutrient values.
//!
//! A value is compared with one band per field. Values inside the band are
//! never touched. Values at least a full decade outside it are taken to be a
//! unit slip (µg stored as mg, per-kg stored as per-100 g, ...) and rescaled by
//! the smallest power of ten that lands them inside the band, then clamped.
//! Because every correction ends inside the band, applying the corrector
//! twice gives the same result as applying it once.

use serde::Serialize;

use crate::nutrients::{Band, Nutrient, NutrientValues};

/// How far outside the band a value must be to count as mis-scaled. Foods that
/// are merely rich for their category (cheese, crisps, cream) stay below this.
pub const DECADE: f64 = 10.0;

/// Largest rescale the corrector applies (10^3, µg vs mg).
pub const MAX_DECADES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    #[serde(skip)]
    pub nutrient: Nutrient,
    pub field: &'static str,
    pub old_value: f64,
    pub new_value: f64,
    pub reason: String,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Corrects one value against `band`, or returns `None` when it should stay.
pub fn correct(n: Nutrient, value: f64, band: Band) -> Option<FieldChange> {
    if !value.is_finite() || value <= 0.0 || band.contains(value) {
        return None;
    }
    let unit = n.unit().symbol();

    let (scaled, reason) = if value > band.max {
        if band.max <= 0.0 || value < band.max * DECADE {
            return None;
        }
        let k = (1..=MAX_DECADES).find(|k| value / 10f64.powi(*k as i32) <= band.max)?;
        let divisor = 10u32.pow(k);
        (
            value / divisor as f64,
            format!("divided by {divisor}: above {} {unit}", band.max),
        )
    } else {
        if value * DECADE > band.min {
            return None;
        }
        let k = (1..=MAX_DECADES).find(|k| value * 10f64.powi(*k as i32) >= band.min)?;
        let factor = 10u32.pow(k);
        (
            value * factor as f64,
            format!("multiplied by {factor}: below {} {unit}", band.min),
        )
    };

    Some(FieldChange {
        nutrient: n,
        field: n.column(),
        old_value: value,
        new_value: round4(band.clamp(scaled)),
        reason,
    })
}

/// Applies [`correct`] to every present value, using `band_for` to pick each
/// field's band. Returns the corrected values and what changed.
pub fn correct_values<F>(values: &NutrientValues, band_for: F) -> (NutrientValues, Vec<FieldChange>)
where
    F: Fn(Nutrient) -> Band,
{
    let mut corrected = *values;
    let mut changes = Vec::new();
    for (n, value) in values.present() {
        if let Some(change) = correct(n, value, band_for(n)) {
            corrected.set(n, Some(change.new_value));
            changes.push(change);
        }
    }
    (corrected, changes)
}
