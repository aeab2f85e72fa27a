//! Collapses near-duplicate listings coming from different sources.

use std::collections::{BTreeSet, HashSet};

use crate::domain::product::Product;

/// Lowercase, non-alphanumerics to single spaces, trimmed.
pub fn normalize_name(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_set(text: &str) -> BTreeSet<&str> {
    text.split_whitespace().collect()
}

/// |A ∩ B| / |A ∪ B|; two empty sets score zero.
pub fn jaccard(left: &BTreeSet<&str>, right: &BTreeSet<&str>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(right).count() as f64 / union as f64
}

pub fn name_similarity(left: &str, right: &str) -> f64 {
    let left = normalize_name(left);
    let right = normalize_name(right);
    jaccard(&word_set(&left), &word_set(&right))
}

/// Keeps the first-seen listing of every group whose normalized names are
/// more similar than `threshold`. Listings repeating an accepted id are
/// dropped too.
pub fn deduplicate(candidates: Vec<Product>, threshold: f64) -> Vec<Product> {
    let mut accepted: Vec<Product> = Vec::with_capacity(candidates.len());
    let mut accepted_names: Vec<String> = Vec::with_capacity(candidates.len());
    let mut seen_ids = HashSet::new();

    for candidate in candidates {
        if seen_ids.contains(&candidate.id) {
            continue;
        }

        let normalized = normalize_name(&candidate.name);
        let words = word_set(&normalized);
        let duplicate = accepted_names
            .iter()
            .any(|existing| jaccard(&words, &word_set(existing)) > threshold);
        if duplicate {
            continue;
        }

        seen_ids.insert(candidate.id.clone());
        accepted_names.push(normalized);
        accepted.push(candidate);
    }

    accepted
}
