//! Preference-based re-ranking.

use crate::domain::preferences::PreferenceRecord;
use crate::domain::product::Product;
use crate::domain::recommendation::ScoredProduct;

use super::{
    AVERAGE_BUDGET_BOOST, AVERAGE_BUDGET_TOLERANCE, CATEGORY_AFFINITY_CAP,
    CATEGORY_AFFINITY_WEIGHT, PRICE_RANGE_BOOST, STORE_AFFINITY_CAP, STORE_AFFINITY_WEIGHT,
};

pub fn personalization_boost(product: &Product, preferences: &PreferenceRecord) -> f64 {
    let mut boost = 0.0;

    let category_count = preferences.category_affinity(product.category);
    if category_count > 0 {
        boost += (f64::from(category_count) * CATEGORY_AFFINITY_WEIGHT).min(CATEGORY_AFFINITY_CAP);
    }

    // The average budget only counts when the price misses the known range.
    let in_range = preferences
        .price_range
        .bounds()
        .is_some_and(|(min, max)| (min..=max).contains(&product.price));
    if in_range {
        boost += PRICE_RANGE_BOOST;
    } else if let Some(average) = preferences.average_budget.filter(|average| *average > 0) {
        let average = average as f64;
        if (product.price as f64 - average).abs() <= AVERAGE_BUDGET_TOLERANCE * average {
            boost += AVERAGE_BUDGET_BOOST;
        }
    }

    let store_count = preferences.store_affinity(&product.store);
    if store_count > 0 {
        boost += (f64::from(store_count) * STORE_AFFINITY_WEIGHT).min(STORE_AFFINITY_CAP);
    }

    boost
}

/// Adds each product's boost to its score and re-sorts descending. Equal
/// scores keep their incoming order.
pub fn apply_personalization(scored: &mut [ScoredProduct], preferences: &PreferenceRecord) {
    for entry in scored.iter_mut() {
        let boost = personalization_boost(&entry.product, preferences);
        entry.relevance_score += boost;
        entry.personalization_boost = Some(boost);
    }
    sort_by_score(scored);
}

pub fn sort_by_score(scored: &mut [ScoredProduct]) {
    scored.sort_by(|left, right| right.relevance_score.total_cmp(&left.relevance_score));
}
