use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::product::{Category, Product};
use crate::domain::recommendation::RecommendedProduct;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

impl PriceRange {
    /// Both bounds, when both are known and non-zero.
    pub fn bounds(&self) -> Option<(u64, u64)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > 0 && max > 0 => Some((min, max)),
            _ => None,
        }
    }
}

/// Long-lived per-user affinity record. Also used as the increment that a
/// completed search contributes, see [`PreferenceRecord::observed`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    #[serde(default)]
    pub preferred_categories: BTreeMap<Category, u32>,
    #[serde(default)]
    pub preferred_stores: BTreeMap<String, u32>,
    #[serde(default)]
    pub price_range: PriceRange,
    #[serde(default)]
    pub average_budget: Option<u64>,
}

impl PreferenceRecord {
    /// Builds a record from loosely-typed JSON. Each field that does not have
    /// the expected shape falls back to its default instead of failing the
    /// whole record.
    pub fn from_json(value: &Value) -> Self {
        let mut record = Self::default();
        let Some(object) = value.as_object() else {
            return record;
        };

        if let Some(Value::Object(categories)) = object.get("preferredCategories") {
            for (key, count) in categories {
                if let (Ok(category), Some(count)) = (key.parse::<Category>(), lenient_count(count))
                {
                    record.preferred_categories.insert(category, count);
                }
            }
        }

        if let Some(Value::Object(stores)) = object.get("preferredStores") {
            for (key, count) in stores {
                if let Some(count) = lenient_count(count) {
                    record.preferred_stores.insert(key.to_ascii_lowercase(), count);
                }
            }
        }

        if let Some(Value::Object(range)) = object.get("priceRange") {
            record.price_range.min = range.get("min").and_then(lenient_amount);
            record.price_range.max = range.get("max").and_then(lenient_amount);
        }

        record.average_budget = object.get("averageBudget").and_then(lenient_amount);
        record
    }

    /// The increment contributed by one set of search results.
    pub fn observed<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        Self::observe(
            products.into_iter().map(|product| (product.category, product.store.as_str(), product.price)),
        )
    }

    /// Same as [`PreferenceRecord::observed`] for products already returned
    /// to a caller.
    pub fn observed_results(results: &[RecommendedProduct]) -> Self {
        Self::observe(results.iter().map(|result| (result.category, result.store.as_str(), result.price)))
    }

    fn observe<'a>(listings: impl Iterator<Item = (Category, &'a str, u64)>) -> Self {
        let mut record = Self::default();
        let mut total: u64 = 0;
        let mut count: u64 = 0;

        for (category, store, price) in listings {
            *record.preferred_categories.entry(category).or_insert(0) += 1;
            *record.preferred_stores.entry(store.to_string()).or_insert(0) += 1;

            if price > 0 {
                record.price_range.min = Some(record.price_range.min.map_or(price, |min| min.min(price)));
                record.price_range.max = Some(record.price_range.max.map_or(price, |max| max.max(price)));
            }

            total = total.saturating_add(price);
            count += 1;
        }

        if count > 0 {
            record.average_budget = Some((total as f64 / count as f64).round() as u64);
        }
        record
    }

    /// Folds an increment into this record: counts add, the price range only
    /// widens, and the average budget moves half way towards the observed one.
    pub fn merge(&mut self, increment: &PreferenceRecord) {
        for (category, count) in &increment.preferred_categories {
            let entry = self.preferred_categories.entry(*category).or_insert(0);
            *entry = entry.saturating_add(*count);
        }
        for (store, count) in &increment.preferred_stores {
            let entry = self.preferred_stores.entry(store.clone()).or_insert(0);
            *entry = entry.saturating_add(*count);
        }

        if let Some(min) = increment.price_range.min {
            if self.price_range.min.map_or(true, |current| min < current) {
                self.price_range.min = Some(min);
            }
        }
        if let Some(max) = increment.price_range.max {
            if self.price_range.max.map_or(true, |current| max > current) {
                self.price_range.max = Some(max);
            }
        }

        if let Some(observed) = increment.average_budget {
            self.average_budget = Some(match self.average_budget {
                // round((old + new) / 2), halves round up
                Some(previous) => previous.saturating_add(observed).saturating_add(1) / 2,
                None => observed,
            });
        }
    }

    pub fn category_affinity(&self, category: Category) -> u32 {
        self.preferred_categories.get(&category).copied().unwrap_or(0)
    }

    pub fn store_affinity(&self, store: &str) -> u32 {
        self.preferred_stores.get(store).copied().unwrap_or(0)
    }

    /// Category with the highest affinity; ties keep declaration order.
    pub fn top_category(&self) -> Option<Category> {
        let mut best: Option<(Category, u32)> = None;
        for category in Category::ALL {
            let count = self.category_affinity(category);
            if count > 0 && best.map_or(true, |(_, top)| count > top) {
                best = Some((category, count));
            }
        }
        best.map(|(category, _)| category)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn lenient_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64))
            .map(|v| v.min(u64::from(u32::MAX)) as u32),
        _ => None,
    }
}

fn lenient_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v.round() as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}
