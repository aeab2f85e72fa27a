use async_trait::async_trait;
use thiserror::Error;

use shopsage_core::domain::history::SearchHistoryEntry;
use shopsage_core::domain::preferences::PreferenceRecord;
use shopsage_core::domain::product::ProductId;
use shopsage_core::domain::wishlist::WishlistItem;

pub mod history;
pub mod memory;
pub mod preference;
pub mod wishlist;

pub use history::SqlSearchHistoryRepository;
pub use memory::{
    InMemoryPreferenceRepository, InMemorySearchHistoryRepository, InMemoryWishlistRepository,
};
pub use preference::SqlPreferenceRepository;
pub use wishlist::SqlWishlistRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// The stored record, or an empty one for users never seen before.
    async fn find(&self, user_id: &str) -> Result<PreferenceRecord, RepositoryError>;
    async fn save(&self, user_id: &str, record: &PreferenceRecord) -> Result<(), RepositoryError>;
    async fn reset(&self, user_id: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SearchHistoryRepository: Send + Sync {
    async fn append(&self, entry: SearchHistoryEntry) -> Result<(), RepositoryError>;
    /// Newest first.
    async fn list(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<SearchHistoryEntry>, RepositoryError>;
    /// Returns the number of removed entries.
    async fn clear(&self, user_id: &str) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    /// Newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<WishlistItem>, RepositoryError>;
    /// `false` when the product is already on the list.
    async fn add(&self, user_id: &str, item: WishlistItem) -> Result<bool, RepositoryError>;
    /// `false` when the product was not on the list.
    async fn remove(&self, user_id: &str, product_id: &ProductId)
        -> Result<bool, RepositoryError>;
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn to_db_amount(amount: u64) -> Result<i64, RepositoryError> {
    i64::try_from(amount).map_err(|_| RepositoryError::Decode(format!("amount {amount} overflows")))
}

pub(crate) fn from_db_amount(amount: i64) -> Result<u64, RepositoryError> {
    u64::try_from(amount).map_err(|_| RepositoryError::Decode(format!("negative amount {amount}")))
}
