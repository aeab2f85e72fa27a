pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use repositories::{
    InMemoryPreferenceRepository, InMemorySearchHistoryRepository, InMemoryWishlistRepository,
    PreferenceRepository, RepositoryError, SearchHistoryRepository, SqlPreferenceRepository,
    SqlSearchHistoryRepository, SqlWishlistRepository, WishlistRepository,
};
