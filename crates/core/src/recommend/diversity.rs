//! Top-N selection that spreads picks across stores and categories.

use std::collections::HashSet;

use crate::domain::recommendation::ScoredProduct;

/// Picks up to `limit` entries from a score-descending list.
///
/// The first pass accepts an entry only when its store or its category is not
/// yet represented. If that leaves slots open, a second pass fills them in
/// score order with anything not already picked.
pub fn select_diverse(ranked: &[ScoredProduct], limit: usize) -> Vec<ScoredProduct> {
    let mut picked: Vec<usize> = Vec::with_capacity(limit.min(ranked.len()));
    let mut stores: HashSet<&str> = HashSet::new();
    let mut categories = HashSet::new();

    for (index, entry) in ranked.iter().enumerate() {
        if picked.len() >= limit {
            break;
        }
        let new_store = !stores.contains(entry.product.store.as_str());
        let new_category = !categories.contains(&entry.product.category);
        if new_store || new_category {
            stores.insert(entry.product.store.as_str());
            categories.insert(entry.product.category);
            picked.push(index);
        }
    }

    if picked.len() < limit {
        let mut picked_ids: HashSet<_> = picked.iter().map(|index| ranked[*index].id()).collect();
        for (index, entry) in ranked.iter().enumerate() {
            if picked.len() >= limit {
                break;
            }
            if picked_ids.insert(entry.id()) {
                picked.push(index);
            }
        }
    }

    picked.into_iter().map(|index| ranked[index].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::select_diverse;
    use crate::catalog::local_catalog;
    use crate::domain::product::{Category, Product, ProductId};
    use crate::domain::recommendation::ScoredProduct;

    fn candidate(id: &str, category: Category, store: &str, score: f64) -> ScoredProduct {
        let template = local_catalog().remove(0);
        ScoredProduct::new(
            Product {
                id: ProductId::from(id),
                name: format!("Laptop {id}"),
                category,
                store: store.to_string(),
                ..template
            },
            score,
        )
    }

    fn ids(selected: &[ScoredProduct]) -> Vec<&str> {
        selected.iter().map(|entry| entry.id().as_str()).collect()
    }

    #[test]
    fn one_per_category_before_repeats() {
        let ranked = vec![
            candidate("a", Category::Gaming, "local", 50.0),
            candidate("b", Category::Gaming, "local", 40.0),
            candidate("c", Category::Coding, "local", 30.0),
            candidate("d", Category::Student, "local", 20.0),
            candidate("e", Category::Office, "local", 10.0),
        ];

        let selected = select_diverse(&ranked, 3);
        assert_eq!(ids(&selected), vec!["a", "c", "d"]);
    }

    #[test]
    fn new_store_alone_is_enough_for_first_pass() {
        let ranked = vec![
            candidate("a", Category::Gaming, "local", 50.0),
            candidate("b", Category::Gaming, "amazon", 40.0),
            candidate("c", Category::Coding, "local", 30.0),
        ];

        assert_eq!(ids(&select_diverse(&ranked, 2)), vec!["a", "b"]);
    }

    #[test]
    fn fallback_fills_remaining_slots_in_score_order() {
        let ranked = vec![
            candidate("a", Category::Gaming, "local", 50.0),
            candidate("b", Category::Gaming, "local", 40.0),
            candidate("c", Category::Coding, "local", 30.0),
            candidate("d", Category::Gaming, "local", 20.0),
        ];

        assert_eq!(ids(&select_diverse(&ranked, 3)), vec!["a", "c", "b"]);
    }

    #[test]
    fn never_exceeds_limit_or_candidate_count() {
        let ranked = vec![
            candidate("a", Category::Gaming, "local", 50.0),
            candidate("b", Category::Gaming, "local", 40.0),
        ];

        assert_eq!(select_diverse(&ranked, 5).len(), 2);
        assert!(select_diverse(&ranked, 0).is_empty());
        assert!(select_diverse(&[], 3).is_empty());
    }
}
