//! Category synonym and feature keyword tables.
//!
//! The tables are plain data so they can be tuned from a TOML file without
//! touching the interpreter. Order is significant everywhere: categories are
//! tie-broken in table order and feature levels are scanned in table order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::{Category, Feature, FeatureLevel};

/// Keyword dimension that is recognised but never turned into a feature
/// requirement. Price intent is handled by budget extraction instead.
pub const BUDGET_DIMENSION: &str = "budget";

#[derive(Debug, Error)]
pub enum KeywordError {
    #[error("could not read keyword file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse keyword file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid keyword table: {0}")]
    Invalid(String),
    #[error("keyword pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTables {
    pub categories: Vec<CategoryKeywords>,
    pub features: Vec<FeatureKeywords>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub category: Category,
    pub synonyms: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureKeywords {
    pub dimension: String,
    pub levels: Vec<LevelKeywords>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelKeywords {
    pub level: String,
    pub keywords: Vec<String>,
}

/// A feature dimension after validation: typed levels in scan order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFeature {
    pub feature: Feature,
    pub levels: Vec<(FeatureLevel, Vec<String>)>,
}

impl KeywordTables {
    pub fn load(path: &Path) -> Result<Self, KeywordError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| KeywordError::ReadFile { path: path.to_path_buf(), source })?;
        let tables = toml::from_str::<Self>(&raw)
            .map_err(|source| KeywordError::ParseFile { path: path.to_path_buf(), source })?;
        tables.resolve_features()?;
        Ok(tables)
    }

    /// Built-in tables, or the file at `path` when one is configured.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, KeywordError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Typed feature tables with the budget dimension skipped. Fails when a
    /// dimension or level is unknown, or a level is outside its hierarchy.
    pub fn resolve_features(&self) -> Result<Vec<ResolvedFeature>, KeywordError> {
        let mut resolved = Vec::with_capacity(self.features.len());

        for table in &self.features {
            if table.dimension.eq_ignore_ascii_case(BUDGET_DIMENSION) {
                continue;
            }
            let feature = table
                .dimension
                .parse::<Feature>()
                .map_err(|error| KeywordError::Invalid(error.to_string()))?;

            let mut levels = Vec::with_capacity(table.levels.len());
            for entry in &table.levels {
                let level = entry
                    .level
                    .parse::<FeatureLevel>()
                    .map_err(|error| KeywordError::Invalid(error.to_string()))?;
                if feature.rank_of(level).is_none() {
                    return Err(KeywordError::Invalid(format!(
                        "level `{level}` is not part of the {feature} hierarchy"
                    )));
                }
                levels.push((level, lowercase_all(&entry.keywords)));
            }
            resolved.push(ResolvedFeature { feature, levels });
        }

        Ok(resolved)
    }
}

fn lowercase_all(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|word| word.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|word| (*word).to_string()).collect()
}

fn level(level: &str, keywords: &[&str]) -> LevelKeywords {
    LevelKeywords { level: level.to_string(), keywords: words(keywords) }
}

impl Default for KeywordTables {
    fn default() -> Self {
        let categories = vec![
            CategoryKeywords {
                category: Category::Gaming,
                synonyms: words(&[
                    "gaming", "game", "gamer", "gpu", "graphics", "rgb", "esports", "streaming",
                ]),
            },
            CategoryKeywords {
                category: Category::Coding,
                synonyms: words(&[
                    "coding",
                    "code",
                    "developer",
                    "development",
                    "programming",
                    "programmer",
                    "software",
                    "tech",
                    "technical",
                    "workstation",
                ]),
            },
            CategoryKeywords {
                category: Category::Student,
                synonyms: words(&[
                    "student",
                    "study",
                    "college",
                    "school",
                    "university",
                    "education",
                    "learning",
                    "academic",
                    "campus",
                ]),
            },
            CategoryKeywords {
                category: Category::Office,
                synonyms: words(&[
                    "office",
                    "work",
                    "business",
                    "corporate",
                    "professional",
                    "enterprise",
                    "workplace",
                    "meetings",
                ]),
            },
        ];

        let features = vec![
            FeatureKeywords {
                dimension: "performance".to_string(),
                levels: vec![
                    level(
                        "high",
                        &[
                            "high performance",
                            "powerful",
                            "fast",
                            "speed",
                            "quick",
                            "strong",
                            "performance",
                            "powerhouse",
                        ],
                    ),
                    level("very_high", &["very high", "extreme", "top", "best performance", "maximum"]),
                    level("medium", &["medium", "moderate", "average"]),
                    level("low", &["basic", "low"]),
                ],
            },
            FeatureKeywords {
                dimension: "battery".to_string(),
                levels: vec![
                    level(
                        "excellent",
                        &["long battery", "battery life", "all day", "long lasting", "endurance"],
                    ),
                    level("good", &["good battery", "decent battery"]),
                    level("medium", &["average battery", "medium battery"]),
                ],
            },
            FeatureKeywords {
                dimension: "weight".to_string(),
                levels: vec![
                    level(
                        "very_light",
                        &[
                            "lightweight",
                            "light weight",
                            "thin",
                            "slim",
                            "portable",
                            "compact",
                            "ultrabook",
                        ],
                    ),
                    level("light", &["light", "portable", "easy to carry"]),
                    level("heavy", &["heavy", "powerful", "workstation"]),
                ],
            },
            FeatureKeywords {
                dimension: "display".to_string(),
                levels: vec![
                    level(
                        "high",
                        &["good display", "high resolution", "hd", "full hd", "clear screen"],
                    ),
                    level("very_high", &["4k", "uhd", "retina", "premium display"]),
                    level("medium", &["decent display", "ok screen"]),
                ],
            },
            FeatureKeywords {
                dimension: BUDGET_DIMENSION.to_string(),
                levels: vec![
                    level(
                        "affordable",
                        &["budget", "cheap", "affordable", "economical", "low price", "inexpensive"],
                    ),
                    level("expensive", &["premium", "expensive", "high end", "top end"]),
                ],
            },
        ];

        Self { categories, features }
    }
}
