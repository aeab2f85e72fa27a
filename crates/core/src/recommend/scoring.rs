//! Additive relevance scoring.

use crate::domain::product::Product;
use crate::recommend::query::{Budget, BudgetKind, QuerySignals};

use super::{
    CATEGORY_MATCH_POINTS, FEATURE_EXACT_POINTS, FEATURE_STEP_PENALTY, NAME_WORD_POINTS,
    RATING_WEIGHT, TAG_MATCH_POINTS,
};

/// Scores one product against the interpreted query. Pure: identical inputs
/// always give identical output and the product is only read.
pub fn relevance_score(product: &Product, query: &str, signals: &QuerySignals) -> f64 {
    let lowered = query.to_lowercase();

    let mut score = product.rating * RATING_WEIGHT;

    if signals.category == Some(product.category) {
        score += CATEGORY_MATCH_POINTS;
    }

    score += tag_points(product, &lowered);
    score += name_points(product, &lowered);

    if let Some(budget) = &signals.budget {
        score += budget_points(product.price, budget);
    }

    score + feature_points(product, signals)
}

fn tag_points(product: &Product, lowered_query: &str) -> f64 {
    let matches = product
        .tags
        .iter()
        .filter(|tag| !tag.is_empty() && lowered_query.contains(tag.to_lowercase().as_str()))
        .count();
    matches as f64 * TAG_MATCH_POINTS
}

fn name_points(product: &Product, lowered_query: &str) -> f64 {
    let matches = product
        .name
        .to_lowercase()
        .split_whitespace()
        .filter(|word| lowered_query.contains(word))
        .count();
    matches as f64 * NAME_WORD_POINTS
}

pub fn budget_points(price: u64, budget: &Budget) -> f64 {
    match budget.kind {
        BudgetKind::Range => {
            if price >= budget.min && price <= budget.max {
                10.0
            } else if price < budget.max {
                5.0
            } else {
                0.0
            }
        }
        BudgetKind::Max => {
            if budget.max == 0 {
                return if price == 0 { 10.0 } else { 0.0 };
            }
            let ratio = price as f64 / budget.max as f64;
            if ratio <= 0.8 {
                10.0
            } else if ratio <= 1.0 {
                8.0
            } else if ratio <= 1.2 {
                3.0
            } else {
                0.0
            }
        }
    }
}

fn feature_points(product: &Product, signals: &QuerySignals) -> f64 {
    signals
        .features
        .iter()
        .map(|(feature, requested)| match product.feature(*feature) {
            Some(level) if level == *requested => FEATURE_EXACT_POINTS,
            Some(level) => match (feature.rank_of(*requested), feature.rank_of(level)) {
                (Some(wanted), Some(actual)) => {
                    let steps = wanted.abs_diff(actual) as f64;
                    (FEATURE_EXACT_POINTS - FEATURE_STEP_PENALTY * steps).max(0.0)
                }
                _ => 0.0,
            },
            None => 0.0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{budget_points, relevance_score};
    use crate::catalog::local_catalog;
    use crate::domain::product::{Category, Feature, FeatureLevel, Product};
    use crate::recommend::keywords::KeywordTables;
    use crate::recommend::query::{Budget, QueryInterpreter, QuerySignals};

    fn seed(name: &str) -> Product {
        local_catalog().into_iter().find(|product| product.name == name).expect("seed exists")
    }

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn max_budget_tiers_follow_price_ratio() {
        let budget = Budget::at_most(50_000);
        assert_eq!(budget_points(40_000, &budget), 10.0);
        assert_eq!(budget_points(50_000, &budget), 8.0);
        assert_eq!(budget_points(60_000, &budget), 3.0);
        assert_eq!(budget_points(60_001, &budget), 0.0);
    }

    #[test]
    fn range_budget_rewards_inside_then_below() {
        let budget = Budget::range(30_000, 40_000);
        assert_eq!(budget_points(35_000, &budget), 10.0);
        assert_eq!(budget_points(40_000, &budget), 10.0);
        assert_eq!(budget_points(20_000, &budget), 5.0);
        assert_eq!(budget_points(45_000, &budget), 0.0);
    }

    #[test]
    fn only_rating_counts_without_signals() {
        let product = seed("Office Laptop Standard");
        let score = relevance_score(&product, "something else", &QuerySignals::default());
        assert!(approx(score, 7.8));
    }

    #[test]
    fn partial_feature_matches_lose_two_points_per_step() {
        let product = seed("Workstation Powerhouse");
        let mut signals = QuerySignals::default();
        signals.features.insert(Feature::Performance, FeatureLevel::Medium);
        signals.features.insert(Feature::Display, FeatureLevel::VeryHigh);
        signals.features.insert(Feature::Weight, FeatureLevel::VeryLight);

        // performance 2 steps: 1, display exact: 5, weight 3 steps: 0
        let score = relevance_score(&product, "x", &signals);
        assert!(approx(score, 4.6 * 2.0 + 1.0 + 5.0));
    }

    #[test]
    fn budget_fit_outranks_higher_rating_for_gaming_under_60000() {
        let interpreter = QueryInterpreter::new(&KeywordTables::default()).expect("compile");
        let query = "gaming laptop under 60000";
        let signals = interpreter.interpret(query);

        let pro = relevance_score(&seed("Gaming Laptop Pro"), query, &signals);
        let budget = relevance_score(&seed("Budget Gaming Laptop"), query, &signals);

        assert!(approx(pro, 34.5), "got {pro}");
        assert!(approx(budget, 36.7), "got {budget}");
        assert!(budget > pro);
    }

    #[test]
    fn scoring_is_idempotent_and_leaves_product_untouched() {
        let interpreter = QueryInterpreter::new(&KeywordTables::default()).expect("compile");
        let query = "lightweight student laptop 40000-50000 with long battery";
        let signals = interpreter.interpret(query);
        let product = seed("Student Laptop Budget");
        let before = product.clone();

        let first = relevance_score(&product, query, &signals);
        let second = relevance_score(&product, query, &signals);

        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(product, before);
        assert_eq!(signals.category, Some(Category::Student));
    }
}
