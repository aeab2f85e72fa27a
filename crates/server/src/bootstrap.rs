use std::sync::Arc;
use std::time::Duration;

use shopsage_core::config::{AppConfig, ConfigError, LoadOptions};
use shopsage_core::recommend::keywords::KeywordError;
use shopsage_core::recommend::{builtin_source, CatalogSource, RecommendationEngine};
use shopsage_db::{
    connect_with_config, migrations, DbPool, SqlPreferenceRepository,
    SqlSearchHistoryRepository, SqlWishlistRepository,
};
use thiserror::Error;
use tracing::info;

use crate::api::ApiState;
use crate::stores::AffiliateApiSource;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("keyword tables could not be loaded: {0}")]
    Keywords(#[from] KeywordError),
    #[error("marketplace client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let sources = catalog_sources(&config)?;
    let engine = RecommendationEngine::from_config(&config, sources)?;
    info!(
        event_name = "system.bootstrap.engine_ready",
        correlation_id = "bootstrap",
        sources = ?engine.source_names(),
        "recommendation engine ready"
    );

    let api = ApiState {
        engine: Arc::new(engine),
        preferences: Arc::new(SqlPreferenceRepository::new(db_pool.clone())),
        history: Arc::new(SqlSearchHistoryRepository::new(db_pool.clone())),
        wishlist: Arc::new(SqlWishlistRepository::new(db_pool.clone())),
    };

    Ok(Application { config, db_pool, api })
}

/// Configured sources in merge order. The affiliate API stands in for the
/// simulated flipkart listings when it is enabled.
fn catalog_sources(config: &AppConfig) -> Result<Vec<Arc<dyn CatalogSource>>, BootstrapError> {
    let timeout = Duration::from_millis(config.stores.timeout_ms);
    let affiliate = AffiliateApiSource::from_config(&config.stores.affiliate, timeout)
        .map_err(BootstrapError::HttpClient)?;
    let mut affiliate = affiliate.map(|source| Arc::new(source) as Arc<dyn CatalogSource>);

    let mut sources = Vec::with_capacity(config.stores.sources.len());
    for name in &config.stores.sources {
        if name == "flipkart" {
            if let Some(live) = affiliate.take() {
                sources.push(live);
                continue;
            }
        }
        sources.extend(builtin_source(name));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use shopsage_core::config::{ConfigOverrides, LoadOptions};
    use shopsage_db::repositories::PreferenceRepository;

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str, sources: Option<&[&str]>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                sources: sources.map(|names| names.iter().map(|name| name.to_string()).collect()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_unknown_sources() {
        let result = bootstrap(overrides("sqlite::memory:", Some(&["local", "ebay"]))).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("ebay"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_configured_sources() {
        let app = bootstrap(overrides("sqlite::memory:?cache=shared", Some(&["local", "amazon"])))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('user_preference', 'search_history', 'wishlist_item')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected tables to be available after bootstrap");
        assert_eq!(table_count, 3);

        assert_eq!(app.api.engine.source_names(), vec!["local", "amazon"]);

        let preferences = app.api.preferences.find("nobody").await.expect("preferences");
        assert!(preferences.is_empty());

        app.db_pool.close().await;
    }
}
