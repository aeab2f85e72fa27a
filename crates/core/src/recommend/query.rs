//! Turns free text into structured signals: budget, category intent and
//! requested feature levels.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Category, FeatureLevels};
use crate::recommend::keywords::{KeywordError, KeywordTables, ResolvedFeature};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetKind {
    Max,
    Range,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub min: u64,
    pub max: u64,
    #[serde(rename = "type")]
    pub kind: BudgetKind,
}

impl Budget {
    pub fn at_most(max: u64) -> Self {
        Self { min: 0, max, kind: BudgetKind::Max }
    }

    pub fn range(min: u64, max: u64) -> Self {
        Self { min, max, kind: BudgetKind::Range }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySignals {
    pub budget: Option<Budget>,
    pub category: Option<Category>,
    #[serde(default)]
    pub features: FeatureLevels,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BudgetPattern {
    UpperBoundPhrase,
    UpperBoundSuffix,
    Range,
    Around,
    BareNumber,
}

const AMOUNT: &str = r"(\d[\d,]*k?)";

impl BudgetPattern {
    /// Tried in this order; the first pattern that matches decides the budget.
    const ORDERED: [BudgetPattern; 5] = [
        BudgetPattern::UpperBoundPhrase,
        BudgetPattern::UpperBoundSuffix,
        BudgetPattern::Range,
        BudgetPattern::Around,
        BudgetPattern::BareNumber,
    ];

    fn source(self) -> String {
        match self {
            Self::UpperBoundPhrase => format!(
                r"(?:under|below|upto|up to|maximum|max|less than|at most)\s*₹?\s*{AMOUNT}"
            ),
            Self::UpperBoundSuffix => {
                format!(r"₹?\s*{AMOUNT}\s*(?:and below|or less|maximum|max)")
            }
            Self::Range => format!(r"₹?\s*{AMOUNT}\s*-\s*₹?\s*{AMOUNT}"),
            Self::Around => format!(r"around\s*₹?\s*{AMOUNT}"),
            Self::BareNumber => format!(r"₹?\s*{AMOUNT}"),
        }
    }
}

#[derive(Clone, Debug)]
struct CompiledCategory {
    category: Category,
    synonyms: Vec<(String, Regex)>,
}

#[derive(Clone, Debug)]
pub struct QueryInterpreter {
    budget_patterns: Vec<(BudgetPattern, Regex)>,
    categories: Vec<CompiledCategory>,
    features: Vec<ResolvedFeature>,
}

impl QueryInterpreter {
    pub fn new(tables: &KeywordTables) -> Result<Self, KeywordError> {
        let budget_patterns = BudgetPattern::ORDERED
            .into_iter()
            .map(|pattern| Regex::new(&pattern.source()).map(|regex| (pattern, regex)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut categories = Vec::with_capacity(tables.categories.len());
        for table in &tables.categories {
            let mut synonyms = Vec::with_capacity(table.synonyms.len());
            for synonym in &table.synonyms {
                let synonym = synonym.trim().to_lowercase();
                if synonym.is_empty() {
                    continue;
                }
                let whole_word = Regex::new(&format!(r"\b{}\b", regex::escape(&synonym)))?;
                synonyms.push((synonym, whole_word));
            }
            categories.push(CompiledCategory { category: table.category, synonyms });
        }

        Ok(Self { budget_patterns, categories, features: tables.resolve_features()? })
    }

    pub fn interpret(&self, query: &str) -> QuerySignals {
        let lowered = query.to_lowercase();
        QuerySignals {
            budget: self.budget_in(&lowered),
            category: self.category_in(&lowered),
            features: self.features_in(&lowered),
        }
    }

    pub fn extract_budget(&self, query: &str) -> Option<Budget> {
        self.budget_in(&query.to_lowercase())
    }

    pub fn detect_category(&self, query: &str) -> Option<Category> {
        self.category_in(&query.to_lowercase())
    }

    pub fn extract_features(&self, query: &str) -> FeatureLevels {
        self.features_in(&query.to_lowercase())
    }

    // NOTE: the bare-number pattern accepts any digits in the text, so a
    // spec figure such as "16gb" can be read as a budget when no price
    // phrase precedes it.
    fn budget_in(&self, lowered: &str) -> Option<Budget> {
        for (pattern, regex) in &self.budget_patterns {
            let Some(captures) = regex.captures(lowered) else {
                continue;
            };

            if *pattern == BudgetPattern::Range {
                let low = captures.get(1).and_then(|m| parse_amount(m.as_str()));
                let high = captures.get(2).and_then(|m| parse_amount(m.as_str()));
                if let (Some(low), Some(high)) = (low, high) {
                    return Some(Budget::range(low.min(high), low.max(high)));
                }
            } else if let Some(max) = captures.get(1).and_then(|m| parse_amount(m.as_str())) {
                return Some(Budget::at_most(max));
            }
        }
        None
    }

    fn category_in(&self, lowered: &str) -> Option<Category> {
        let mut best: Option<(Category, u32)> = None;

        for table in &self.categories {
            let mut score = 0;
            for (synonym, whole_word) in &table.synonyms {
                if lowered.contains(synonym.as_str()) {
                    score += 1;
                    if whole_word.is_match(lowered) {
                        score += 2;
                    }
                }
            }
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((table.category, score));
            }
        }

        best.map(|(category, _)| category)
    }

    fn features_in(&self, lowered: &str) -> FeatureLevels {
        let mut features = FeatureLevels::new();
        for table in &self.features {
            let matched = table.levels.iter().find(|(_, keywords)| {
                keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
            });
            if let Some((level, _)) = matched {
                features.insert(table.feature, *level);
            }
        }
        features
    }
}

fn parse_amount(raw: &str) -> Option<u64> {
    let (digits, multiplier) = match raw.strip_suffix('k') {
        Some(digits) => (digits, 1_000),
        None => (raw, 1),
    };
    let cleaned: String = digits.chars().filter(|ch| *ch != ',').collect();
    cleaned.parse::<u64>().ok()?.checked_mul(multiplier)
}
