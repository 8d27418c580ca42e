use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, Row};
use time::OffsetDateTime;

use crate::calibration::category::Category;
use crate::nutrients::{Nutrient, NutrientValues};

/// Food record in the database. Nutrient values are per 100 g.
#[derive(Debug, Clone, Serialize)]
pub struct FoodRecord {
    pub id: i32,                        // assigned by the database, immutable
    pub name_en: Option<String>,        // English name
    pub name_cz: Option<String>,        // localized name
    pub category: Option<String>,       // last classifier output
    pub source: Option<String>,         // provenance tag, informational only
    pub accuracy_score: Option<f64>,    // plausibility confidence in [0, 1]
    #[serde(flatten)]
    pub nutrients: NutrientValues,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl FoodRecord {
    /// Name used for classification and display: English first, then localized.
    pub fn display_name(&self) -> &str {
        self.name_en
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.name_cz.as_deref())
            .unwrap_or("")
    }

    pub fn stored_category(&self) -> Option<Category> {
        self.category.as_deref().and_then(Category::parse)
    }
}

impl<'r> FromRow<'r, PgRow> for FoodRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let mut nutrients = NutrientValues::default();
        for n in Nutrient::ALL {
            nutrients.set(n, row.try_get::<Option<f64>, _>(n.column())?);
        }
        Ok(Self {
            id: row.try_get("id")?,
            name_en: row.try_get("name_en")?,
            name_cz: row.try_get("name_cz")?,
            category: row.try_get("category")?,
            source: row.try_get("source")?,
            accuracy_score: row.try_get("accuracy_score")?,
            nutrients,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Append-only audit row describing one correction or batch run.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub food_id: Option<i32>,           // NULL for batch summaries
    pub action: String,
    pub details: serde_json::Value,     // before/after payload
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub food_id: Option<i32>,
    pub action: &'static str,
    pub details: serde_json::Value,
}

/// Field-level update of one food, written together with its audit row.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodUpdate {
    pub id: i32,
    pub category: Option<Category>,
    /// Candidate score; storage keeps the larger of this and the stored one.
    pub accuracy_score: Option<f64>,
    pub source: Option<&'static str>,
    pub nutrients: Vec<(Nutrient, f64)>,
    pub audit: NewAuditEntry,
}
