pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod recommend;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::history::SearchHistoryEntry;
pub use domain::preferences::{PreferenceRecord, PriceRange};
pub use domain::product::{Category, Feature, FeatureLevel, Product, ProductId};
pub use domain::recommendation::{RecommendedProduct, ScoredProduct};
pub use domain::wishlist::WishlistItem;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use recommend::{
    CatalogSource, Recommendation, RecommendationEngine, RecommendationFilters,
    RecommendationRequest, SourceError, SourceKind, SourceRequest,
};
