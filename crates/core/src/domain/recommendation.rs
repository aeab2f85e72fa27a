use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::product::{Category, FeatureLevels, Product, ProductId};

/// A candidate with its derived scoring fields. Exists only while a ranking
/// request runs; callers receive [`RecommendedProduct`] instead.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredProduct {
    pub product: Product,
    pub relevance_score: f64,
    pub personalization_boost: Option<f64>,
    pub explanation: Option<String>,
}

impl ScoredProduct {
    pub fn new(product: Product, relevance_score: f64) -> Self {
        Self { product, relevance_score, personalization_boost: None, explanation: None }
    }

    pub fn id(&self) -> &ProductId {
        &self.product.id
    }

    pub fn into_recommendation(self) -> RecommendedProduct {
        let Product { id, name, price, rating, category, store, tags, features, specs, affiliate_url, .. } =
            self.product;
        RecommendedProduct {
            id,
            name,
            price,
            rating,
            category,
            store,
            specs,
            features,
            tags,
            affiliate_url,
            explanation: self.explanation,
        }
    }
}

/// Cleaned output record. Scoring internals never reach this shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
    pub rating: f64,
    pub category: Category,
    pub store: String,
    pub specs: BTreeMap<String, String>,
    pub features: FeatureLevels,
    pub tags: Vec<String>,
    pub affiliate_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}
