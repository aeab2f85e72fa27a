//! Cross-store price comparison for one product name.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::recommend::dedup::jaccard;

use super::COMPARE_SIMILARITY_THRESHOLD;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOffer {
    pub store: String,
    pub product_id: ProductId,
    pub price: u64,
    pub url: Option<String>,
}

impl From<&Product> for StoreOffer {
    fn from(product: &Product) -> Self {
        Self {
            store: product.store.clone(),
            product_id: product.id.clone(),
            price: product.price,
            url: product.affiliate_url.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceComparison {
    pub name: String,
    pub offers: Vec<StoreOffer>,
    pub best_price: u64,
    pub savings: u64,
}

fn lowercase_words(name: &str) -> Vec<String> {
    name.to_lowercase().split_whitespace().map(str::to_string).collect()
}

impl PriceComparison {
    fn pair(anchor: &Product, counterpart: &Product) -> Self {
        let best_price = anchor.price.min(counterpart.price);
        Self {
            name: anchor.name.clone(),
            offers: vec![StoreOffer::from(anchor), StoreOffer::from(counterpart)],
            best_price,
            savings: anchor.price.max(counterpart.price) - best_price,
        }
    }
}

/// One comparison for every pair of similarly named listings from two
/// different stores, named after the listing of the earlier store. Sorted by
/// best price, cheapest first.
pub fn match_offers(listings_by_store: &[Vec<Product>]) -> Vec<PriceComparison> {
    let word_lists: Vec<Vec<Vec<String>>> = listings_by_store
        .iter()
        .map(|listings| listings.iter().map(|listing| lowercase_words(&listing.name)).collect())
        .collect();

    let mut comparisons = Vec::new();
    for (position, anchor_listings) in listings_by_store.iter().enumerate() {
        for (offset, other_listings) in listings_by_store[position + 1..].iter().enumerate() {
            let other_words = &word_lists[position + 1 + offset];

            for (anchor, anchor_words) in anchor_listings.iter().zip(&word_lists[position]) {
                let anchor_set: BTreeSet<&str> = anchor_words.iter().map(String::as_str).collect();

                for (candidate, words) in other_listings.iter().zip(other_words) {
                    let set: BTreeSet<&str> = words.iter().map(String::as_str).collect();
                    if jaccard(&anchor_set, &set) > COMPARE_SIMILARITY_THRESHOLD {
                        comparisons.push(PriceComparison::pair(anchor, candidate));
                    }
                }
            }
        }
    }

    comparisons.sort_by_key(|comparison| comparison.best_price);
    comparisons
}
