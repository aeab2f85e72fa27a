use serde::{Deserialize, Serialize};

use crate::domain::product::{Category, FeatureLevels, Product};
use crate::recommend::query::{Budget, QuerySignals};

/// Caller-supplied signals. Any value given here replaces what the query
/// interpreter detected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationFilters {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub features: Option<FeatureLevels>,
}

impl RecommendationFilters {
    pub fn apply_to(&self, signals: &mut QuerySignals) {
        if let Some(category) = self.category {
            signals.category = Some(category);
        }
        if let Some(budget) = self.budget {
            signals.budget = Some(budget);
        }
        if let Some(features) = &self.features {
            signals.features = features.clone();
        }
    }
}

/// Hard constraints that remove candidates before scoring.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default)]
    pub min_price: Option<u64>,
    #[serde(default)]
    pub max_price: Option<u64>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.min_price.map_or(true, |min| product.price >= min)
            && self.max_price.map_or(true, |max| product.price <= max)
            && self.category.map_or(true, |category| product.category == category)
            && self.store.as_deref().map_or(true, |store| product.store.eq_ignore_ascii_case(store))
            && self.min_rating.map_or(true, |rating| product.rating >= rating)
    }

    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        if self.is_empty() {
            return products;
        }
        products.into_iter().filter(|product| self.matches(product)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ProductFilter, RecommendationFilters};
    use crate::catalog::local_catalog;
    use crate::domain::product::{Category, Feature, FeatureLevel, FeatureLevels};
    use crate::recommend::query::{Budget, QuerySignals};

    #[test]
    fn explicit_filters_replace_detected_signals() {
        let mut signals = QuerySignals {
            budget: Some(Budget::at_most(50_000)),
            category: Some(Category::Gaming),
            features: FeatureLevels::from([(Feature::Performance, FeatureLevel::VeryHigh)]),
        };
        let filters = RecommendationFilters {
            category: Some(Category::Office),
            budget: None,
            features: Some(FeatureLevels::from([(Feature::Battery, FeatureLevel::Excellent)])),
        };

        filters.apply_to(&mut signals);

        assert_eq!(signals.category, Some(Category::Office));
        assert_eq!(signals.budget, Some(Budget::at_most(50_000)));
        assert_eq!(signals.features.len(), 1);
        assert_eq!(signals.features.get(&Feature::Battery), Some(&FeatureLevel::Excellent));
    }

    #[test]
    fn product_filter_combines_every_bound() {
        let filter = ProductFilter {
            min_price: Some(45_000),
            max_price: Some(60_000),
            min_rating: Some(4.2),
            ..ProductFilter::default()
        };

        let names: Vec<_> =
            filter.apply(local_catalog()).into_iter().map(|product| product.name).collect();
        assert_eq!(names, vec!["Coding Laptop Elite", "Ultrabook Lightweight", "Business Pro Laptop"]);
    }

    #[test]
    fn store_match_ignores_case() {
        let filter = ProductFilter { store: Some("LOCAL".to_string()), ..ProductFilter::default() };
        assert_eq!(filter.apply(local_catalog()).len(), 8);

        let filter = ProductFilter { store: Some("amazon".to_string()), ..ProductFilter::default() };
        assert!(filter.apply(local_catalog()).is_empty());
    }
}
