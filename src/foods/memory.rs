use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo::FoodStore;
use super::repo_types::{AuditLogEntry, FoodRecord, FoodUpdate, NewAuditEntry};
use crate::nutrients::NutrientValues;

/// In-memory [`FoodStore`] used by tests; mirrors the SQL update semantics.
#[derive(Default)]
pub struct MemoryFoodStore {
    foods: Mutex<Vec<FoodRecord>>,
    audit: Mutex<Vec<AuditLogEntry>>,
    failing_ids: Mutex<HashSet<i32>>,
    fail_list: Mutex<bool>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryFoodStore {
    pub fn with_foods(foods: Vec<FoodRecord>) -> Self {
        let store = Self::default();
        *lock(&store.foods) = foods;
        store
    }

    /// Makes `apply_update` fail for this id.
    pub fn fail_updates_for(&self, id: i32) {
        lock(&self.failing_ids).insert(id);
    }

    /// Makes `list_foods` fail.
    pub fn fail_listing(&self) {
        *lock(&self.fail_list) = true;
    }

    pub fn food(&self, id: i32) -> Option<FoodRecord> {
        lock(&self.foods).iter().find(|f| f.id == id).cloned()
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        lock(&self.audit).clone()
    }

    fn push_audit(&self, entry: &NewAuditEntry) {
        let mut audit = lock(&self.audit);
        let id = audit.len() as i64 + 1;
        audit.push(AuditLogEntry {
            id,
            food_id: entry.food_id,
            action: entry.action.to_string(),
            details: entry.details.clone(),
            created_at: OffsetDateTime::now_utc(),
        });
    }
}

/// Builds a food record for tests.
pub fn food(id: i32, name: &str, nutrients: NutrientValues) -> FoodRecord {
    let now = OffsetDateTime::now_utc();
    FoodRecord {
        id,
        name_en: Some(name.to_string()),
        name_cz: None,
        category: None,
        source: None,
        accuracy_score: None,
        nutrients,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl FoodStore for MemoryFoodStore {
    async fn list_foods(&self, limit: Option<i64>) -> anyhow::Result<Vec<FoodRecord>> {
        if *lock(&self.fail_list) {
            anyhow::bail!("connection refused");
        }
        let mut foods = lock(&self.foods).clone();
        foods.sort_by_key(|f| f.id);
        if let Some(limit) = limit {
            foods.truncate(limit.max(0) as usize);
        }
        Ok(foods)
    }

    async fn get_food(&self, id: i32) -> anyhow::Result<Option<FoodRecord>> {
        Ok(self.food(id))
    }

    async fn search_by_name(&self, query: &str, limit: i64) -> anyhow::Result<Vec<FoodRecord>> {
        let q = query.to_lowercase();
        let mut hits: Vec<FoodRecord> = lock(&self.foods)
            .iter()
            .filter(|f| {
                [&f.name_en, &f.name_cz]
                    .into_iter()
                    .flatten()
                    .any(|n| n.to_lowercase().contains(&q))
            })
            .cloned()
            .collect();
        hits.sort_by_key(|f| f.id);
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }

    async fn apply_update(&self, update: &FoodUpdate) -> anyhow::Result<()> {
        if lock(&self.failing_ids).contains(&update.id) {
            anyhow::bail!("write conflict on food {}", update.id);
        }
        {
            let mut foods = lock(&self.foods);
            let Some(food) = foods.iter_mut().find(|f| f.id == update.id) else {
                anyhow::bail!("food {} no longer exists", update.id);
            };
            if let Some(category) = update.category {
                food.category = Some(category.as_str().to_string());
            }
            if let Some(score) = update.accuracy_score {
                let prior = food.accuracy_score.unwrap_or(0.0);
                food.accuracy_score = Some(prior.max(score.clamp(0.0, 1.0)).min(1.0));
            }
            if let Some(source) = update.source {
                food.source = Some(source.to_string());
            }
            for (n, value) in &update.nutrients {
                food.nutrients.set(*n, Some(*value));
            }
            food.updated_at = OffsetDateTime::now_utc();
        }
        self.push_audit(&update.audit);
        Ok(())
    }

    async fn append_audit(&self, entry: &NewAuditEntry) -> anyhow::Result<()> {
        self.push_audit(entry);
        Ok(())
    }

    async fn list_audit(&self, food_id: i32) -> anyhow::Result<Vec<AuditLogEntry>> {
        let mut rows: Vec<AuditLogEntry> = lock(&self.audit)
            .iter()
            .filter(|e| e.food_id == Some(food_id))
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }
}
