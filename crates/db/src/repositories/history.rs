use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use shopsage_core::domain::history::SearchHistoryEntry;

use super::{decode_err, from_db_amount, to_db_amount, RepositoryError, SearchHistoryRepository};
use crate::DbPool;

pub struct SqlSearchHistoryRepository {
    pool: DbPool,
}

impl SqlSearchHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC timestamps so lexical order matches time order.
pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc)).map_err(decode_err)
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<SearchHistoryEntry, RepositoryError> {
    let user_id: String = row.try_get("user_id").map_err(decode_err)?;
    let query: String = row.try_get("query").map_err(decode_err)?;
    let results_count: i64 = row.try_get("results_count").map_err(decode_err)?;
    let categories: String = row.try_get("categories").map_err(decode_err)?;
    let average_price: Option<i64> = row.try_get("average_price").map_err(decode_err)?;
    let products: String = row.try_get("products").map_err(decode_err)?;
    let searched_at: String = row.try_get("searched_at").map_err(decode_err)?;

    Ok(SearchHistoryEntry {
        user_id,
        query,
        results_count: u32::try_from(results_count).map_err(decode_err)?,
        categories: serde_json::from_str(&categories).map_err(decode_err)?,
        average_price: average_price.map(from_db_amount).transpose()?,
        products: serde_json::from_str(&products).map_err(decode_err)?,
        searched_at: parse_timestamp(&searched_at)?,
    })
}

#[async_trait::async_trait]
impl SearchHistoryRepository for SqlSearchHistoryRepository {
    async fn append(&self, entry: SearchHistoryEntry) -> Result<(), RepositoryError> {
        let categories = serde_json::to_string(&entry.categories).map_err(decode_err)?;
        let products = serde_json::to_string(&entry.products).map_err(decode_err)?;
        let average_price = entry.average_price.map(to_db_amount).transpose()?;

        sqlx::query(
            "INSERT INTO search_history
                (user_id, query, results_count, categories, average_price, products, searched_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.user_id)
        .bind(&entry.query)
        .bind(i64::from(entry.results_count))
        .bind(categories)
        .bind(average_price)
        .bind(products)
        .bind(timestamp(&entry.searched_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<SearchHistoryEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_id, query, results_count, categories, average_price, products, searched_at
             FROM search_history
             WHERE user_id = ?
             ORDER BY searched_at DESC, id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()
    }

    async fn clear(&self, user_id: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM search_history WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use shopsage_core::catalog::local_catalog;
    use shopsage_core::domain::history::SearchHistoryEntry;
    use shopsage_core::domain::recommendation::ScoredProduct;

    use super::SqlSearchHistoryRepository;
    use crate::repositories::SearchHistoryRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlSearchHistoryRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlSearchHistoryRepository::new(pool)
    }

    fn entry(user_id: &str, query: &str, minutes: i64) -> SearchHistoryEntry {
        let results: Vec<_> = local_catalog()
            .into_iter()
            .take(2)
            .map(|product| ScoredProduct::new(product, 1.0).into_recommendation())
            .collect();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp")
            + Duration::minutes(minutes);
        SearchHistoryEntry::record(user_id, query, &results, at)
    }

    #[tokio::test]
    async fn entries_list_newest_first_within_limit() {
        let repo = repository().await;
        repo.append(entry("u-1", "gaming laptop", 0)).await.expect("append");
        repo.append(entry("u-1", "office laptop", 5)).await.expect("append");
        repo.append(entry("u-1", "student laptop", 10)).await.expect("append");
        repo.append(entry("u-2", "coding laptop", 20)).await.expect("append");

        let listed = repo.list("u-1", 2).await.expect("list");
        let queries: Vec<_> = listed.iter().map(|entry| entry.query.as_str()).collect();
        assert_eq!(queries, vec!["student laptop", "office laptop"]);
        assert_eq!(listed[0], entry("u-1", "student laptop", 10));
    }

    #[tokio::test]
    async fn clear_only_removes_that_users_entries() {
        let repo = repository().await;
        repo.append(entry("u-1", "gaming laptop", 0)).await.expect("append");
        repo.append(entry("u-1", "office laptop", 1)).await.expect("append");
        repo.append(entry("u-2", "coding laptop", 2)).await.expect("append");

        assert_eq!(repo.clear("u-1").await.expect("clear"), 2);
        assert!(repo.list("u-1", 50).await.expect("list").is_empty());
        assert_eq!(repo.list("u-2", 50).await.expect("list").len(), 1);
    }
}
