//! Catalog sources and the guarded, concurrent fan-out over them.
//!
//! A source failure never reaches the ranking pipeline: errors and timeouts
//! are logged and replaced by that source's fallback listings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{local_catalog, MockStore, LOCAL_STORE};
use crate::domain::product::Product;
use crate::recommend::query::QuerySignals;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("lookup timed out after {0} ms")]
    Timeout(u64),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("unexpected status code {0}")]
    Status(u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// In-process catalog snapshot.
    Local,
    /// A marketplace, real or simulated. Only stores take part in price
    /// comparison.
    Store,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceRequest {
    pub query: String,
    pub limit: usize,
    pub signals: QuerySignals,
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind {
        SourceKind::Store
    }

    async fn search(&self, request: &SourceRequest) -> Result<Vec<Product>, SourceError>;

    /// Deterministic listings served when `search` fails or times out.
    fn fallback(&self, request: &SourceRequest) -> Vec<Product>;
}

/// Immutable catalog snapshot shared across requests.
#[derive(Clone, Debug)]
pub struct StaticCatalogSource {
    name: String,
    products: Arc<[Product]>,
}

impl StaticCatalogSource {
    pub fn new(name: impl Into<String>, products: Vec<Product>) -> Self {
        Self { name: name.into(), products: products.into() }
    }

    pub fn local() -> Self {
        Self::new(LOCAL_STORE, local_catalog())
    }

    fn first(&self, limit: usize) -> Vec<Product> {
        self.products.iter().take(limit).cloned().collect()
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn search(&self, request: &SourceRequest) -> Result<Vec<Product>, SourceError> {
        Ok(self.first(request.limit))
    }

    fn fallback(&self, request: &SourceRequest) -> Vec<Product> {
        self.first(request.limit)
    }
}

/// Simulated marketplace lookup with fixed listings.
#[derive(Clone, Copy, Debug)]
pub struct MockStoreSource {
    store: MockStore,
}

impl MockStoreSource {
    pub fn new(store: MockStore) -> Self {
        Self { store }
    }

    pub fn amazon() -> Self {
        Self::new(MockStore::Amazon)
    }

    pub fn flipkart() -> Self {
        Self::new(MockStore::Flipkart)
    }
}

#[async_trait]
impl CatalogSource for MockStoreSource {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn search(&self, request: &SourceRequest) -> Result<Vec<Product>, SourceError> {
        Ok(self.fallback(request))
    }

    fn fallback(&self, request: &SourceRequest) -> Vec<Product> {
        let mut listings = self.store.listings(&request.query);
        listings.truncate(request.limit);
        listings
    }
}

/// Runs one lookup under `timeout`. Always yields listings: on error the
/// source's fallback is returned instead.
pub async fn fetch_guarded(
    source: &dyn CatalogSource,
    request: &SourceRequest,
    timeout: Duration,
) -> Vec<Product> {
    let started = Instant::now();
    let outcome = match tokio::time::timeout(timeout, source.search(request)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(timeout.as_millis() as u64)),
    };

    let listings = match outcome {
        Ok(listings) => {
            debug!(
                event_name = "recommend.source.completed",
                source = source.name(),
                listing_count = listings.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "catalog source lookup completed"
            );
            listings
        }
        Err(error) => {
            warn!(
                event_name = "recommend.source.fallback",
                source = source.name(),
                error = %error,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "catalog source failed; serving fallback listings"
            );
            source.fallback(request)
        }
    };

    listings.into_iter().take(request.limit).map(Product::sanitized).collect()
}

/// Queries every source concurrently and concatenates the listings in source
/// order.
pub async fn fetch_all(
    sources: &[Arc<dyn CatalogSource>],
    request: &SourceRequest,
    timeout: Duration,
) -> Vec<Product> {
    let lookups = sources.iter().map(|source| fetch_guarded(source.as_ref(), request, timeout));
    join_all(lookups).await.into_iter().flatten().collect()
}
