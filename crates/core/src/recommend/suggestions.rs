use crate::domain::history::SearchHistoryEntry;
use crate::domain::preferences::PreferenceRecord;

use super::MAX_QUERY_SUGGESTIONS;

/// Follow-up queries built from a user's affinities and recent searches.
/// `history` is expected newest first.
pub fn personalized_queries(
    preferences: &PreferenceRecord,
    history: &[SearchHistoryEntry],
) -> Vec<String> {
    let budget_in_thousands = preferences
        .average_budget
        .filter(|average| *average > 0)
        .map(|average| (average as f64 / 1000.0).round() as u64);

    let mut suggestions = Vec::new();

    if let Some(category) = preferences.top_category() {
        suggestions.push(format!("{category} laptop"));
        if let Some(thousands) = budget_in_thousands {
            suggestions.push(format!("{category} laptop under ₹{thousands}k"));
        }
    }

    if let Some(recent) = history.first() {
        suggestions.push(recent.query.clone());
    }

    if let Some(thousands) = budget_in_thousands {
        suggestions.push(format!("laptop under ₹{thousands}k"));
    }

    suggestions.truncate(MAX_QUERY_SUGGESTIONS);
    suggestions
}
