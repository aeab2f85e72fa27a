use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::{Category, ProductId};
use crate::domain::recommendation::RecommendedProduct;

pub const HISTORY_LIST_LIMIT: u32 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryProduct {
    pub product_id: ProductId,
    pub name: String,
    pub price: u64,
    pub category: Category,
    pub store: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub user_id: String,
    pub query: String,
    pub results_count: u32,
    pub categories: BTreeMap<Category, u32>,
    pub average_price: Option<u64>,
    pub products: Vec<HistoryProduct>,
    pub searched_at: DateTime<Utc>,
}

impl SearchHistoryEntry {
    pub fn record(
        user_id: impl Into<String>,
        query: impl Into<String>,
        results: &[RecommendedProduct],
        searched_at: DateTime<Utc>,
    ) -> Self {
        let mut categories = BTreeMap::new();
        for result in results {
            *categories.entry(result.category).or_insert(0) += 1;
        }

        let average_price = if results.is_empty() {
            None
        } else {
            let total: u64 = results.iter().map(|result| result.price).sum();
            Some((total as f64 / results.len() as f64).round() as u64)
        };

        Self {
            user_id: user_id.into(),
            query: query.into(),
            results_count: results.len() as u32,
            categories,
            average_price,
            products: results
                .iter()
                .map(|result| HistoryProduct {
                    product_id: result.id.clone(),
                    name: result.name.clone(),
                    price: result.price,
                    category: result.category,
                    store: result.store.clone(),
                })
                .collect(),
            searched_at,
        }
    }
}
