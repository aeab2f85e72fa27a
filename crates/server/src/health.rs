use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use shopsage_db::DbPool;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    catalog_sources: Vec<String>,
}

impl HealthState {
    pub fn new(db_pool: DbPool, catalog_sources: Vec<String>) -> Self {
        Self { db_pool, catalog_sources }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

/// `preferences` is the sqlite store behind feedback and personalization;
/// `catalog` lists the product sources the engine fans out to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub preferences: HealthCheck,
    pub catalog: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, catalog_sources: Vec<String>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState::new(db_pool, catalog_sources))
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let preferences = preference_store_check(&state.db_pool).await;
    let catalog = catalog_check(&state.catalog_sources);
    let ready = preferences.status == "ready" && catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("shopsage recommendation api v{}", env!("CARGO_PKG_VERSION")),
        },
        preferences,
        catalog,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn preference_store_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_preference").fetch_one(pool).await {
        Ok(profiles) => HealthCheck { status: "ready", detail: format!("{profiles} stored preference profiles") },
        Err(error) => {
            warn!(
                event_name = "system.health.preferences_degraded",
                correlation_id = "health",
                error = %error,
                "health check could not read the preference store"
            );
            HealthCheck { status: "degraded", detail: format!("preference store unavailable: {error}") }
        }
    }
}

fn catalog_check(sources: &[String]) -> HealthCheck {
    if sources.is_empty() {
        warn!(
            event_name = "system.health.catalog_degraded",
            correlation_id = "health",
            "no catalog sources are configured"
        );
        return HealthCheck { status: "degraded", detail: "no catalog sources configured".to_string() };
    }
    HealthCheck { status: "ready", detail: format!("sources: {}", sources.join(", ")) }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use shopsage_db::{connect_with_settings, migrations::run_pending, DbPool};

    use crate::health::{health, HealthState};

    fn all_sources() -> Vec<String> {
        ["local", "amazon", "flipkart"].into_iter().map(str::to_string).collect()
    }

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        run_pending(&pool).await.expect("migrations should apply");
        pool
    }

    #[tokio::test]
    async fn health_is_ready_with_preference_store_and_sources() {
        let pool = migrated_pool().await;

        let (status, Json(payload)) = health(State(HealthState::new(pool.clone(), all_sources()))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.preferences.status, "ready");
        assert_eq!(payload.preferences.detail, "0 stored preference profiles");
        assert_eq!(payload.catalog.detail, "sources: local, amazon, flipkart");
        assert!(payload.service.detail.starts_with("shopsage recommendation api"));

        pool.close().await;
    }

    #[tokio::test]
    async fn health_is_degraded_when_the_preference_store_is_unreachable() {
        let pool = migrated_pool().await;
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState::new(pool, all_sources()))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.preferences.status, "degraded");
        assert_eq!(payload.catalog.status, "ready");
    }

    #[tokio::test]
    async fn health_is_degraded_without_catalog_sources() {
        let pool = migrated_pool().await;

        let (status, Json(payload)) = health(State(HealthState::new(pool.clone(), Vec::new()))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.preferences.status, "ready");
        assert_eq!(payload.catalog.status, "degraded");
        assert_eq!(payload.catalog.detail, "no catalog sources configured");

        pool.close().await;
    }
}
