use chrono::Utc;
use serde_json::{json, Value};
use sqlx::Row;

use shopsage_core::domain::preferences::PreferenceRecord;

use super::{decode_err, to_db_amount, PreferenceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPreferenceRepository {
    pool: DbPool,
}

impl SqlPreferenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn json_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Value, RepositoryError> {
    let raw: String = row.try_get(column).map_err(decode_err)?;
    Ok(serde_json::from_str(&raw).unwrap_or(Value::Null))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PreferenceRecord, RepositoryError> {
    let price_min: Option<i64> = row.try_get("price_min").map_err(decode_err)?;
    let price_max: Option<i64> = row.try_get("price_max").map_err(decode_err)?;
    let average_budget: Option<i64> = row.try_get("average_budget").map_err(decode_err)?;

    // Stored columns go through the same lenient reader as API payloads, so a
    // damaged column degrades to its default instead of failing the lookup.
    Ok(PreferenceRecord::from_json(&json!({
        "preferredCategories": json_column(row, "preferred_categories")?,
        "preferredStores": json_column(row, "preferred_stores")?,
        "priceRange": { "min": price_min, "max": price_max },
        "averageBudget": average_budget,
    })))
}

#[async_trait::async_trait]
impl PreferenceRepository for SqlPreferenceRepository {
    async fn find(&self, user_id: &str) -> Result<PreferenceRecord, RepositoryError> {
        let row = sqlx::query(
            "SELECT preferred_categories, preferred_stores, price_min, price_max, average_budget
             FROM user_preference
             WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_record(&row),
            None => Ok(PreferenceRecord::default()),
        }
    }

    async fn save(&self, user_id: &str, record: &PreferenceRecord) -> Result<(), RepositoryError> {
        let categories = serde_json::to_string(&record.preferred_categories).map_err(decode_err)?;
        let stores = serde_json::to_string(&record.preferred_stores).map_err(decode_err)?;
        let price_min = record.price_range.min.map(to_db_amount).transpose()?;
        let price_max = record.price_range.max.map(to_db_amount).transpose()?;
        let average_budget = record.average_budget.map(to_db_amount).transpose()?;

        sqlx::query(
            "INSERT INTO user_preference
                (user_id, preferred_categories, preferred_stores, price_min, price_max,
                 average_budget, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                preferred_categories = excluded.preferred_categories,
                preferred_stores = excluded.preferred_stores,
                price_min = excluded.price_min,
                price_max = excluded.price_max,
                average_budget = excluded.average_budget,
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(categories)
        .bind(stores)
        .bind(price_min)
        .bind(price_max)
        .bind(average_budget)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset(&self, user_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM user_preference WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shopsage_core::catalog::local_catalog;
    use shopsage_core::domain::preferences::PreferenceRecord;
    use shopsage_core::domain::product::Category;

    use super::SqlPreferenceRepository;
    use crate::repositories::PreferenceRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlPreferenceRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlPreferenceRepository::new(pool)
    }

    #[tokio::test]
    async fn unknown_user_gets_empty_record() {
        let repo = repository().await;
        assert!(repo.find("nobody").await.expect("find").is_empty());
    }

    #[tokio::test]
    async fn saved_record_is_found_and_overwritten() {
        let repo = repository().await;
        let catalog = local_catalog();

        let mut record = PreferenceRecord::default();
        record.merge(&PreferenceRecord::observed(catalog.iter().take(2)));
        repo.save("u-1", &record).await.expect("save");
        assert_eq!(repo.find("u-1").await.expect("find"), record);

        record.merge(&PreferenceRecord::observed(catalog.iter().skip(6)));
        repo.save("u-1", &record).await.expect("save again");
        let stored = repo.find("u-1").await.expect("find again");
        assert_eq!(stored.category_affinity(Category::Gaming), 2);
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn reset_forgets_the_user() {
        let repo = repository().await;
        let mut record = PreferenceRecord::default();
        record.preferred_categories.insert(Category::Office, 3);
        repo.save("u-2", &record).await.expect("save");

        repo.reset("u-2").await.expect("reset");
        assert!(repo.find("u-2").await.expect("find").is_empty());
    }
}
