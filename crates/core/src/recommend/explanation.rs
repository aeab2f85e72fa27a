//! Human-readable reasons attached to each ranked product.

use crate::domain::product::{Feature, FeatureLevel, Product};
use crate::recommend::query::{BudgetKind, QuerySignals};

pub const FALLBACK_EXPLANATION: &str = "A great match based on your preferences.";

/// Applicable reasons in fixed priority order, joined into sentences.
pub fn explain(product: &Product, signals: &QuerySignals) -> String {
    let mut reasons: Vec<String> = Vec::new();

    if let Some(category) = signals.category.filter(|category| *category == product.category) {
        reasons.push(format!("Perfect for {category} needs"));
    }

    if let Some(budget) = signals.budget.filter(|budget| product.price <= budget.max) {
        reasons.push(match budget.kind {
            BudgetKind::Range => format!(
                "Within your budget range (₹{} - ₹{})",
                group_thousands(budget.min),
                group_thousands(budget.max)
            ),
            BudgetKind::Max => format!("Within your budget of ₹{}", group_thousands(budget.max)),
        });
    }

    if product.rating >= 4.5 {
        reasons.push("Highly rated by users".to_string());
    }

    if product.feature(Feature::Battery) == Some(FeatureLevel::Excellent) {
        reasons.push("Excellent battery life".to_string());
    }

    if matches!(product.feature(Feature::Weight), Some(FeatureLevel::Light | FeatureLevel::VeryLight))
    {
        reasons.push("Lightweight and portable".to_string());
    }

    if matches!(
        product.feature(Feature::Performance),
        Some(FeatureLevel::High | FeatureLevel::VeryHigh)
    ) {
        reasons.push("High performance".to_string());
    }

    if reasons.is_empty() {
        FALLBACK_EXPLANATION.to_string()
    } else {
        format!("{}.", reasons.join(". "))
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::{explain, group_thousands, FALLBACK_EXPLANATION};
    use crate::catalog::local_catalog;
    use crate::domain::product::{Category, Feature, FeatureLevel};
    use crate::recommend::query::{Budget, QuerySignals};

    #[test]
    fn thousands_are_comma_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(50_000), "50,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn clauses_follow_priority_order() {
        let product = local_catalog().into_iter().nth(7).expect("business pro"); // 58000, 4.3
        let signals = QuerySignals {
            budget: Some(Budget::at_most(60_000)),
            category: Some(Category::Office),
            features: Default::default(),
        };

        assert_eq!(
            explain(&product, &signals),
            "Perfect for office needs. Within your budget of ₹60,000. Excellent battery life. \
             Lightweight and portable. High performance."
        );
    }

    #[test]
    fn range_budget_names_both_bounds() {
        let product = local_catalog().into_iter().nth(3).expect("office standard"); // 42000
        let signals =
            QuerySignals { budget: Some(Budget::range(30_000, 45_000)), ..QuerySignals::default() };

        assert_eq!(
            explain(&product, &signals),
            "Within your budget range (₹30,000 - ₹45,000). Lightweight and portable."
        );
    }

    #[test]
    fn over_budget_products_get_no_budget_clause() {
        let product = local_catalog().remove(0); // 65000, 4.5
        let signals = QuerySignals { budget: Some(Budget::at_most(60_000)), ..QuerySignals::default() };

        assert_eq!(explain(&product, &signals), "Highly rated by users. High performance.");
    }

    #[test]
    fn no_applicable_reason_uses_fallback() {
        let mut product = local_catalog().into_iter().nth(6).expect("budget gaming"); // 4.1, medium
        product.features.insert(Feature::Weight, FeatureLevel::Heavy);

        assert_eq!(explain(&product, &QuerySignals::default()), FALLBACK_EXPLANATION);
    }
}
