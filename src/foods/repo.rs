use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::repo_types::{AuditLogEntry, FoodRecord, FoodUpdate, NewAuditEntry};
use crate::nutrients::Nutrient;

/// Storage seam for food records and their audit trail.
#[async_trait]
pub trait FoodStore: Send + Sync {
    /// All foods ordered by id, truncated to `limit` when given.
    async fn list_foods(&self, limit: Option<i64>) -> anyhow::Result<Vec<FoodRecord>>;
    async fn get_food(&self, id: i32) -> anyhow::Result<Option<FoodRecord>>;
    /// Case-insensitive substring match on either name.
    async fn search_by_name(&self, query: &str, limit: i64) -> anyhow::Result<Vec<FoodRecord>>;
    /// Applies one update and its audit row as a single commit.
    async fn apply_update(&self, update: &FoodUpdate) -> anyhow::Result<()>;
    async fn append_audit(&self, entry: &NewAuditEntry) -> anyhow::Result<()>;
    /// Audit rows of one food, newest first.
    async fn list_audit(&self, food_id: i32) -> anyhow::Result<Vec<AuditLogEntry>>;
}

lazy_static! {
    static ref FOOD_COLUMNS: String = {
        let mut cols = vec![
            "id", "name_en", "name_cz", "category", "source", "accuracy_score",
            "created_at", "updated_at",
        ];
        cols.extend(Nutrient::ALL.iter().map(|n| n.column()));
        cols.join(", ")
    };
}

#[derive(Clone)]
pub struct PgFoodStore {
    db: PgPool,
}

impl PgFoodStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FoodStore for PgFoodStore {
    async fn list_foods(&self, limit: Option<i64>) -> anyhow::Result<Vec<FoodRecord>> {
        // LIMIT NULL means no limit in Postgres
        let sql = format!(
            "SELECT {} FROM foods ORDER BY id ASC LIMIT $1",
            FOOD_COLUMNS.as_str()
        );
        let rows = sqlx::query_as::<_, FoodRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .context("list foods")?;
        Ok(rows)
    }

    async fn get_food(&self, id: i32) -> anyhow::Result<Option<FoodRecord>> {
        let sql = format!("SELECT {} FROM foods WHERE id = $1", FOOD_COLUMNS.as_str());
        let row = sqlx::query_as::<_, FoodRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("get food {}", id))?;
        Ok(row)
    }

    async fn search_by_name(&self, query: &str, limit: i64) -> anyhow::Result<Vec<FoodRecord>> {
        let sql = format!(
            r#"
            SELECT {}
              FROM foods
             WHERE LOWER(name_en) LIKE LOWER($1) ESCAPE '\'
                OR LOWER(name_cz) LIKE LOWER($1) ESCAPE '\'
             ORDER BY id ASC
             LIMIT $2
            "#,
            FOOD_COLUMNS.as_str()
        );
        let rows = sqlx::query_as::<_, FoodRecord>(&sql)
            .bind(contains_pattern(query))
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .context("search foods by name")?;
        Ok(rows)
    }

    async fn apply_update(&self, update: &FoodUpdate) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE foods SET updated_at = NOW()");
        if let Some(category) = update.category {
            qb.push(", category = ").push_bind(category.as_str());
        }
        if let Some(score) = update.accuracy_score {
            // Never lower a score another run already wrote; never leave [0, 1].
            qb.push(", accuracy_score = LEAST(GREATEST(COALESCE(accuracy_score, 0), ")
                .push_bind(score.clamp(0.0, 1.0))
                .push("), 1.0)");
        }
        if let Some(source) = update.source {
            qb.push(", source = ").push_bind(source);
        }
        for (n, value) in &update.nutrients {
            qb.push(", ").push(n.column()).push(" = ").push_bind(*value);
        }
        qb.push(" WHERE id = ").push_bind(update.id);

        let res = qb
            .build()
            .execute(&mut *tx)
            .await
            .with_context(|| format!("update food {}", update.id))?;
        if res.rows_affected() == 0 {
            anyhow::bail!("food {} no longer exists", update.id);
        }

        insert_audit(&mut tx, &update.audit).await?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn append_audit(&self, entry: &NewAuditEntry) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        insert_audit(&mut tx, entry).await?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn list_audit(&self, food_id: i32) -> anyhow::Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, food_id, action, details, created_at
              FROM food_audit_log
             WHERE food_id = $1
             ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(food_id)
        .fetch_all(&self.db)
        .await
        .context("list audit log")?;
        Ok(rows)
    }
}

/// `LIKE` pattern matching `query` literally anywhere in the text.
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

async fn insert_audit(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    entry: &NewAuditEntry,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO food_audit_log (food_id, action, details)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(entry.food_id) // Option<i32> → NULL allowed
    .bind(entry.action)
    .bind(&entry.details)
    .execute(&mut **tx)
    .await
    .context("insert audit log")?;
    Ok(())
}
