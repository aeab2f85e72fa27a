use sqlx::Row;

use shopsage_core::domain::product::{Category, ProductId};
use shopsage_core::domain::wishlist::WishlistItem;

use super::history::{parse_timestamp, timestamp};
use super::{decode_err, from_db_amount, to_db_amount, RepositoryError, WishlistRepository};
use crate::DbPool;

pub struct SqlWishlistRepository {
    pool: DbPool,
}

impl SqlWishlistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<WishlistItem, RepositoryError> {
    let product_id: String = row.try_get("product_id").map_err(decode_err)?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let price: i64 = row.try_get("price").map_err(decode_err)?;
    let rating: f64 = row.try_get("rating").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let store: String = row.try_get("store").map_err(decode_err)?;
    let affiliate_url: Option<String> = row.try_get("affiliate_url").map_err(decode_err)?;
    let specs: String = row.try_get("specs").map_err(decode_err)?;
    let features: String = row.try_get("features").map_err(decode_err)?;
    let added_at: String = row.try_get("added_at").map_err(decode_err)?;

    Ok(WishlistItem {
        product_id: ProductId(product_id),
        name,
        price: from_db_amount(price)?,
        rating,
        category: category.parse::<Category>().map_err(decode_err)?,
        store,
        affiliate_url,
        specs: serde_json::from_str(&specs).map_err(decode_err)?,
        features: serde_json::from_str(&features).map_err(decode_err)?,
        added_at: parse_timestamp(&added_at)?,
    })
}

#[async_trait::async_trait]
impl WishlistRepository for SqlWishlistRepository {
    async fn list(&self, user_id: &str) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_id, name, price, rating, category, store, affiliate_url, specs,
                    features, added_at
             FROM wishlist_item
             WHERE user_id = ?
             ORDER BY added_at DESC, product_id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect::<Result<Vec<_>, _>>()
    }

    async fn add(&self, user_id: &str, item: WishlistItem) -> Result<bool, RepositoryError> {
        let specs = serde_json::to_string(&item.specs).map_err(decode_err)?;
        let features = serde_json::to_string(&item.features).map_err(decode_err)?;

        let result = sqlx::query(
            "INSERT INTO wishlist_item
                (user_id, product_id, name, price, rating, category, store, affiliate_url,
                 specs, features, added_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, product_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(item.product_id.as_str())
        .bind(&item.name)
        .bind(to_db_amount(item.price)?)
        .bind(item.rating)
        .bind(item.category.as_str())
        .bind(&item.store)
        .bind(&item.affiliate_url)
        .bind(specs)
        .bind(features)
        .bind(timestamp(&item.added_at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove(
        &self,
        user_id: &str,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlist_item WHERE user_id = ? AND product_id = ?")
            .bind(user_id)
            .bind(product_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
