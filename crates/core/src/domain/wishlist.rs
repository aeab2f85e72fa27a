use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::{Category, FeatureLevels, ProductId};
use crate::domain::recommendation::RecommendedProduct;

/// One saved product; unique per (user, product).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: u64,
    pub rating: f64,
    pub category: Category,
    pub store: String,
    #[serde(default)]
    pub affiliate_url: Option<String>,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
    #[serde(default)]
    pub features: FeatureLevels,
    pub added_at: DateTime<Utc>,
}

impl WishlistItem {
    pub fn from_recommendation(product: &RecommendedProduct, added_at: DateTime<Utc>) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            rating: product.rating,
            category: product.category,
            store: product.store.clone(),
            affiliate_url: product.affiliate_url.clone(),
            specs: product.specs.clone(),
            features: product.features.clone(),
            added_at,
        }
    }
}
