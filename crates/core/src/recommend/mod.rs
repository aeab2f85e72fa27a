//! Recommendation scoring and ranking.
//!
//! Query text is interpreted into signals, candidates are gathered from every
//! configured source and deduplicated, then scored, optionally boosted by user
//! preferences, and reduced to a diversified top-N with explanations.

pub mod compare;
pub mod dedup;
pub mod diversity;
mod engine;
pub mod explanation;
pub mod filters;
pub mod keywords;
pub mod personalization;
pub mod query;
pub mod scoring;
pub mod sources;
pub mod suggestions;

pub use engine::{
    builtin_source, EngineSettings, Recommendation, RecommendationEngine, RecommendationRequest,
};
pub use filters::{ProductFilter, RecommendationFilters};
pub use keywords::{KeywordError, KeywordTables};
pub use query::{Budget, BudgetKind, QueryInterpreter, QuerySignals};
pub use sources::{CatalogSource, SourceError, SourceKind, SourceRequest};

use crate::errors::DomainError;

pub type RecommendResult<T> = Result<T, DomainError>;

pub const RATING_WEIGHT: f64 = 2.0;
pub const CATEGORY_MATCH_POINTS: f64 = 10.0;
pub const TAG_MATCH_POINTS: f64 = 1.5;
pub const NAME_WORD_POINTS: f64 = 4.0;
pub const FEATURE_EXACT_POINTS: f64 = 5.0;
/// Points lost per hierarchy step between requested and actual level.
pub const FEATURE_STEP_PENALTY: f64 = 2.0;

pub const CATEGORY_AFFINITY_WEIGHT: f64 = 0.5;
pub const CATEGORY_AFFINITY_CAP: f64 = 3.0;
pub const PRICE_RANGE_BOOST: f64 = 2.0;
pub const AVERAGE_BUDGET_BOOST: f64 = 1.0;
pub const AVERAGE_BUDGET_TOLERANCE: f64 = 0.2;
pub const STORE_AFFINITY_WEIGHT: f64 = 0.3;
pub const STORE_AFFINITY_CAP: f64 = 2.0;

/// Names more similar than this (Jaccard over normalized words) are the same
/// listing.
pub const DEDUP_SIMILARITY_THRESHOLD: f64 = 0.8;
pub const COMPARE_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const COMPARE_PER_STORE_LIMIT: usize = 5;

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 3;
pub const DEFAULT_SIMILAR_LIMIT: usize = 5;
pub const DEFAULT_TRENDING_LIMIT: usize = 10;
pub const MAX_QUERY_SUGGESTIONS: usize = 3;

pub const TRENDING_QUERIES: [&str; 4] =
    ["gaming laptop", "student laptop", "office laptop", "coding laptop"];
