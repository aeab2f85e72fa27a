use std::collections::HashMap;

use tokio::sync::RwLock;

use shopsage_core::domain::history::SearchHistoryEntry;
use shopsage_core::domain::preferences::PreferenceRecord;
use shopsage_core::domain::product::ProductId;
use shopsage_core::domain::wishlist::WishlistItem;

use super::{PreferenceRepository, RepositoryError, SearchHistoryRepository, WishlistRepository};

#[derive(Default)]
pub struct InMemoryPreferenceRepository {
    records: RwLock<HashMap<String, PreferenceRecord>>,
}

#[async_trait::async_trait]
impl PreferenceRepository for InMemoryPreferenceRepository {
    async fn find(&self, user_id: &str) -> Result<PreferenceRecord, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(user_id).cloned().unwrap_or_default())
    }

    async fn save(&self, user_id: &str, record: &PreferenceRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(user_id.to_string(), record.clone());
        Ok(())
    }

    async fn reset(&self, user_id: &str) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.remove(user_id);
        Ok(())
    }
}

/// Entries are kept in insertion order per user.
#[derive(Default)]
pub struct InMemorySearchHistoryRepository {
    entries: RwLock<HashMap<String, Vec<SearchHistoryEntry>>>,
}

#[async_trait::async_trait]
impl SearchHistoryRepository for InMemorySearchHistoryRepository {
    async fn append(&self, entry: SearchHistoryEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.entry(entry.user_id.clone()).or_default().push(entry);
        Ok(())
    }

    async fn list(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<SearchHistoryEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut listed = entries.get(user_id).cloned().unwrap_or_default();
        // stable: equal timestamps keep newest-appended first after the reverse
        listed.reverse();
        listed.sort_by(|left, right| right.searched_at.cmp(&left.searched_at));
        listed.truncate(limit as usize);
        Ok(listed)
    }

    async fn clear(&self, user_id: &str) -> Result<u64, RepositoryError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(user_id).map_or(0, |removed| removed.len() as u64))
    }
}

#[derive(Default)]
pub struct InMemoryWishlistRepository {
    items: RwLock<HashMap<String, Vec<WishlistItem>>>,
}

#[async_trait::async_trait]
impl WishlistRepository for InMemoryWishlistRepository {
    async fn list(&self, user_id: &str) -> Result<Vec<WishlistItem>, RepositoryError> {
        let items = self.items.read().await;
        let mut listed = items.get(user_id).cloned().unwrap_or_default();
        listed.sort_by(|left, right| {
            right.added_at.cmp(&left.added_at).then_with(|| left.product_id.cmp(&right.product_id))
        });
        Ok(listed)
    }

    async fn add(&self, user_id: &str, item: WishlistItem) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        let saved = items.entry(user_id.to_string()).or_default();
        if saved.iter().any(|existing| existing.product_id == item.product_id) {
            return Ok(false);
        }
        saved.push(item);
        Ok(true)
    }

    async fn remove(
        &self,
        user_id: &str,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        let Some(saved) = items.get_mut(user_id) else {
            return Ok(false);
        };
        let before = saved.len();
        saved.retain(|item| &item.product_id != product_id);
        Ok(saved.len() < before)
    }
}
