use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::domain::preferences::PreferenceRecord;
use crate::domain::product::{Category, Product, ProductId};
use crate::domain::recommendation::{RecommendedProduct, ScoredProduct};
use crate::errors::DomainError;

use super::compare::{match_offers, PriceComparison};
use super::dedup::deduplicate;
use super::diversity::select_diverse;
use super::explanation::explain;
use super::filters::{ProductFilter, RecommendationFilters};
use super::keywords::{KeywordError, KeywordTables};
use super::personalization::{apply_personalization, sort_by_score};
use super::query::{QueryInterpreter, QuerySignals};
use super::scoring::relevance_score;
use super::sources::{
    fetch_all, fetch_guarded, CatalogSource, MockStoreSource, SourceKind, SourceRequest,
    StaticCatalogSource,
};
use super::{
    RecommendResult, COMPARE_PER_STORE_LIMIT, DEDUP_SIMILARITY_THRESHOLD,
    DEFAULT_RECOMMENDATION_LIMIT, DEFAULT_SIMILAR_LIMIT, DEFAULT_TRENDING_LIMIT, TRENDING_QUERIES,
};

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub per_source_limit: usize,
    pub source_timeout: Duration,
    pub dedup_threshold: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_RECOMMENDATION_LIMIT,
            max_limit: 20,
            per_source_limit: 20,
            source_timeout: Duration::from_millis(3_000),
            dedup_threshold: DEDUP_SIMILARITY_THRESHOLD,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_limit: config.recommendation.default_limit,
            max_limit: config.recommendation.max_limit,
            per_source_limit: config.stores.per_source_limit,
            source_timeout: Duration::from_millis(config.stores.timeout_ms),
            dedup_threshold: config.recommendation.dedup_threshold,
        }
    }

    /// An explicit zero is rejected; anything else is capped at `max_limit`.
    fn resolve_limit(&self, requested: Option<usize>, default: usize) -> RecommendResult<usize> {
        match requested {
            Some(0) => Err(DomainError::InvalidLimit),
            requested => Ok(requested.unwrap_or(default).clamp(1, self.max_limit.max(1))),
        }
    }
}

/// One ranking request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecommendationRequest {
    pub query: String,
    pub limit: Option<usize>,
    pub filters: RecommendationFilters,
    pub refine: ProductFilter,
    pub preferences: Option<PreferenceRecord>,
}

impl RecommendationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filters(mut self, filters: RecommendationFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_refine(mut self, refine: ProductFilter) -> Self {
        self.refine = refine;
        self
    }

    pub fn with_preferences(mut self, preferences: PreferenceRecord) -> Self {
        self.preferences = Some(preferences);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub products: Vec<RecommendedProduct>,
    pub signals: QuerySignals,
    /// Distinct candidates considered after deduplication and filtering.
    pub candidate_count: usize,
}

pub struct RecommendationEngine {
    interpreter: QueryInterpreter,
    sources: Vec<Arc<dyn CatalogSource>>,
    settings: EngineSettings,
}

impl std::fmt::Debug for RecommendationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationEngine")
            .field("sources", &self.source_names())
            .field("settings", &self.settings)
            .finish()
    }
}

/// The in-process source registered under `name`, if any.
pub fn builtin_source(name: &str) -> Option<Arc<dyn CatalogSource>> {
    match name {
        "local" => Some(Arc::new(StaticCatalogSource::local())),
        "amazon" => Some(Arc::new(MockStoreSource::amazon())),
        "flipkart" => Some(Arc::new(MockStoreSource::flipkart())),
        _ => None,
    }
}

impl RecommendationEngine {
    pub fn new(
        interpreter: QueryInterpreter,
        sources: Vec<Arc<dyn CatalogSource>>,
        settings: EngineSettings,
    ) -> Self {
        Self { interpreter, sources, settings }
    }

    /// Built-in keyword tables over the local catalog and both simulated
    /// stores.
    pub fn with_defaults() -> Result<Self, KeywordError> {
        let interpreter = QueryInterpreter::new(&KeywordTables::default())?;
        let sources = ["local", "amazon", "flipkart"].into_iter().filter_map(builtin_source).collect();
        Ok(Self::new(interpreter, sources, EngineSettings::default()))
    }

    /// Engine for `config` over the given sources; keyword tables come from
    /// `recommendation.keywords_path` when set.
    pub fn from_config(
        config: &AppConfig,
        sources: Vec<Arc<dyn CatalogSource>>,
    ) -> Result<Self, KeywordError> {
        let tables = KeywordTables::load_or_default(config.recommendation.keywords_path.as_deref())?;
        Ok(Self::new(QueryInterpreter::new(&tables)?, sources, EngineSettings::from_config(config)))
    }

    pub fn interpreter(&self) -> &QueryInterpreter {
        &self.interpreter
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub async fn recommend(&self, request: RecommendationRequest) -> RecommendResult<Recommendation> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(DomainError::EmptyQuery);
        }
        let limit = self.settings.resolve_limit(request.limit, self.settings.default_limit)?;

        let mut signals = self.interpreter.interpret(query);
        request.filters.apply_to(&mut signals);
        debug!(
            event_name = "recommend.query.interpreted",
            category = ?signals.category,
            budget = ?signals.budget,
            feature_count = signals.features.len(),
            "query interpreted"
        );

        let source_request = SourceRequest {
            query: query.to_string(),
            limit: self.settings.per_source_limit,
            signals: signals.clone(),
        };
        let fetched = fetch_all(&self.sources, &source_request, self.settings.source_timeout).await;
        let fetched_count = fetched.len();
        let candidates = request.refine.apply(deduplicate(fetched, self.settings.dedup_threshold));
        let candidate_count = candidates.len();

        let ranked = self.rank(query, &signals, candidates, request.preferences.as_ref(), limit)?;
        info!(
            event_name = "recommend.completed",
            fetched_count,
            candidate_count,
            result_count = ranked.len(),
            personalized = request.preferences.is_some(),
            "recommendation ranked"
        );

        Ok(Recommendation {
            products: ranked.into_iter().map(ScoredProduct::into_recommendation).collect(),
            signals,
            candidate_count,
        })
    }

    /// Scores, explains, boosts and diversifies an already deduplicated
    /// candidate list. Synchronous and free of I/O.
    pub fn rank(
        &self,
        query: &str,
        signals: &QuerySignals,
        candidates: Vec<Product>,
        preferences: Option<&PreferenceRecord>,
        limit: usize,
    ) -> RecommendResult<Vec<ScoredProduct>> {
        let mut scored: Vec<ScoredProduct> = candidates
            .into_iter()
            .map(|product| {
                let score = relevance_score(&product, query, signals);
                let explanation = explain(&product, signals);
                let mut entry = ScoredProduct::new(product, score);
                entry.explanation = Some(explanation);
                entry
            })
            .collect();
        sort_by_score(&mut scored);

        if let Some(preferences) = preferences.filter(|preferences| !preferences.is_empty()) {
            apply_personalization(&mut scored, preferences);
        }

        let selected = select_diverse(&scored, limit);
        verify_selection(&selected, limit)?;
        Ok(selected)
    }

    /// Products like the anchor product or category. The anchor itself is
    /// never part of the result.
    pub async fn similar(
        &self,
        product_id: Option<&ProductId>,
        category: Option<Category>,
        limit: Option<usize>,
    ) -> RecommendResult<Vec<RecommendedProduct>> {
        if product_id.is_none() && category.is_none() {
            return Err(DomainError::MissingSimilarityAnchor);
        }
        let limit = self.settings.resolve_limit(limit, DEFAULT_SIMILAR_LIMIT)?;
        let query = match category {
            Some(category) => format!("{category} laptop"),
            None => "laptop".to_string(),
        };

        let request = RecommendationRequest::new(query)
            .with_limit(limit + 1)
            .with_filters(RecommendationFilters { category, ..RecommendationFilters::default() });
        let mut products = self.recommend(request).await?.products;
        products.retain(|product| Some(&product.id) != product_id);
        products.truncate(limit);
        Ok(products)
    }

    /// Top-rated picks across the popular queries.
    pub async fn trending(&self, limit: Option<usize>) -> RecommendResult<Vec<RecommendedProduct>> {
        if limit == Some(0) {
            return Err(DomainError::InvalidLimit);
        }
        let limit = limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
        let lookups = TRENDING_QUERIES
            .iter()
            .map(|query| self.recommend(RecommendationRequest::new(*query)));

        let mut seen = HashSet::new();
        let mut products = Vec::new();
        for outcome in join_all(lookups).await {
            for product in outcome?.products {
                if seen.insert(product.id.clone()) {
                    products.push(product);
                }
            }
        }

        products.sort_by(|left, right| right.rating.total_cmp(&left.rating));
        products.truncate(limit);
        Ok(products)
    }

    pub async fn compare_prices(&self, product_name: &str) -> RecommendResult<Vec<PriceComparison>> {
        let product_name = product_name.trim();
        if product_name.is_empty() {
            return Err(DomainError::EmptyQuery);
        }

        let request = SourceRequest {
            query: product_name.to_string(),
            limit: COMPARE_PER_STORE_LIMIT,
            signals: self.interpreter.interpret(product_name),
        };
        let stores = self.sources.iter().filter(|source| source.kind() == SourceKind::Store);
        let listings: Vec<Vec<Product>> = join_all(
            stores.map(|source| fetch_guarded(source.as_ref(), &request, self.settings.source_timeout)),
        )
        .await;

        Ok(match_offers(&listings))
    }
}

fn verify_selection(selected: &[ScoredProduct], limit: usize) -> RecommendResult<()> {
    if selected.len() > limit {
        return Err(DomainError::InvariantViolation(format!(
            "selected {} products for a limit of {limit}",
            selected.len()
        )));
    }

    let mut ids = HashSet::with_capacity(selected.len());
    for entry in selected {
        if !ids.insert(entry.id()) {
            return Err(DomainError::InvariantViolation(format!(
                "product `{}` selected twice",
                entry.id()
            )));
        }
        if !entry.relevance_score.is_finite() {
            return Err(DomainError::InvariantViolation(format!(
                "product `{}` has a non-finite score",
                entry.id()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::{builtin_source, EngineSettings, RecommendationEngine, RecommendationRequest};
    use crate::domain::preferences::PreferenceRecord;
    use crate::domain::product::{Category, ProductId};
    use crate::errors::DomainError;
    use crate::recommend::filters::{ProductFilter, RecommendationFilters};
    use crate::recommend::keywords::KeywordTables;
    use crate::recommend::query::{Budget, QueryInterpreter};
    use crate::recommend::sources::StaticCatalogSource;

    fn default_engine() -> RecommendationEngine {
        RecommendationEngine::with_defaults().expect("default engine")
    }

    fn local_engine() -> RecommendationEngine {
        RecommendationEngine::new(
            QueryInterpreter::new(&KeywordTables::default()).expect("compile"),
            vec![Arc::new(StaticCatalogSource::local())],
            EngineSettings::default(),
        )
    }

    fn names(products: &[crate::domain::recommendation::RecommendedProduct]) -> Vec<&str> {
        products.iter().map(|product| product.name.as_str()).collect()
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_the_pipeline() {
        let error = default_engine()
            .recommend(RecommendationRequest::new("   "))
            .await
            .expect_err("blank query must fail");
        assert_eq!(error, DomainError::EmptyQuery);
    }

    #[tokio::test]
    async fn budget_fit_wins_and_diversity_fills_other_categories() {
        let recommendation = local_engine()
            .recommend(RecommendationRequest::new("gaming laptop under 60000"))
            .await
            .expect("recommend");

        assert_eq!(
            names(&recommendation.products),
            vec!["Budget Gaming Laptop", "Business Pro Laptop", "Coding Laptop Elite"]
        );
        assert_eq!(recommendation.signals.budget, Some(Budget::at_most(60_000)));
        assert_eq!(recommendation.candidate_count, 8);
        assert_eq!(
            recommendation.products[0].explanation.as_deref(),
            Some("Perfect for gaming needs. Within your budget of ₹60,000.")
        );
    }

    #[tokio::test]
    async fn all_sources_are_merged_and_spread_across_stores() {
        let recommendation = default_engine()
            .recommend(RecommendationRequest::new("gaming laptop under 60000"))
            .await
            .expect("recommend");

        assert_eq!(recommendation.candidate_count, 12);
        assert_eq!(
            names(&recommendation.products),
            vec!["Budget Gaming Laptop", "Lenovo IdeaPad Gaming 3", "HP Pavilion Gaming"]
        );
        let stores: HashSet<_> =
            recommendation.products.iter().map(|product| product.store.as_str()).collect();
        assert_eq!(stores.len(), 3);
    }

    #[tokio::test]
    async fn identical_requests_give_identical_rankings() {
        let engine = default_engine();
        let request = RecommendationRequest::new("lightweight student laptop with long battery")
            .with_limit(5);

        let first = engine.recommend(request.clone()).await.expect("first");
        let second = engine.recommend(request).await.expect("second");
        assert_eq!(first, second);
        assert_eq!(first.products.len(), 5);
    }

    #[tokio::test]
    async fn gaming_affinity_adds_exactly_two_points_to_gaming_products() {
        let engine = local_engine();
        let query = "laptop";
        let signals = engine.interpreter().interpret(query);
        let catalog = crate::catalog::local_catalog();

        let baseline = engine.rank(query, &signals, catalog.clone(), None, 8).expect("baseline");
        let mut preferences = PreferenceRecord::default();
        preferences.preferred_categories.insert(Category::Gaming, 4);
        let boosted =
            engine.rank(query, &signals, catalog, Some(&preferences), 8).expect("boosted");

        for entry in &boosted {
            let before = baseline
                .iter()
                .find(|candidate| candidate.id() == entry.id())
                .expect("same candidates")
                .relevance_score;
            let expected = if entry.product.category == Category::Gaming { 2.0 } else { 0.0 };
            assert!((entry.relevance_score - before - expected).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn explicit_filters_and_refinements_apply() {
        let recommendation = local_engine()
            .recommend(
                RecommendationRequest::new("laptop")
                    .with_limit(2)
                    .with_filters(RecommendationFilters {
                        category: Some(Category::Student),
                        ..RecommendationFilters::default()
                    })
                    .with_refine(ProductFilter { max_price: Some(50_000), ..ProductFilter::default() }),
            )
            .await
            .expect("recommend");

        assert_eq!(recommendation.signals.category, Some(Category::Student));
        assert_eq!(recommendation.candidate_count, 2);
        assert_eq!(recommendation.products[0].name, "Student Laptop Budget");
        assert!(recommendation.products.iter().all(|product| product.price <= 50_000));
    }

    #[tokio::test]
    async fn limit_is_clamped_to_configured_maximum() {
        let engine = RecommendationEngine::new(
            QueryInterpreter::new(&KeywordTables::default()).expect("compile"),
            vec![Arc::new(StaticCatalogSource::local())],
            EngineSettings { max_limit: 4, ..EngineSettings::default() },
        );

        let recommendation = engine
            .recommend(RecommendationRequest::new("laptop").with_limit(50))
            .await
            .expect("recommend");
        assert_eq!(recommendation.products.len(), 4);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_instead_of_rounded_up() {
        let engine = local_engine();

        assert_eq!(
            engine
                .recommend(RecommendationRequest::new("laptop").with_limit(0))
                .await
                .expect_err("zero limit"),
            DomainError::InvalidLimit
        );
        let anchor = ProductId::from("3");
        assert_eq!(
            engine.similar(Some(&anchor), None, Some(0)).await.expect_err("zero limit"),
            DomainError::InvalidLimit
        );
        assert_eq!(
            engine.trending(Some(0)).await.expect_err("zero limit"),
            DomainError::InvalidLimit
        );
    }

    #[tokio::test]
    async fn similar_requires_an_anchor_and_excludes_it() {
        let engine = local_engine();
        assert_eq!(
            engine.similar(None, None, None).await.expect_err("anchor required"),
            DomainError::MissingSimilarityAnchor
        );

        let anchor = ProductId::from("3");
        let similar = engine
            .similar(Some(&anchor), Some(Category::Student), Some(2))
            .await
            .expect("similar");
        assert_eq!(similar.len(), 2);
        assert!(similar.iter().all(|product| product.id != anchor));
    }

    #[tokio::test]
    async fn trending_is_unique_and_sorted_by_rating() {
        let trending = default_engine().trending(None).await.expect("trending");

        assert!(!trending.is_empty() && trending.len() <= 10);
        let ids: HashSet<_> = trending.iter().map(|product| product.id.clone()).collect();
        assert_eq!(ids.len(), trending.len());
        assert!(trending.windows(2).all(|pair| pair[0].rating >= pair[1].rating));
    }

    #[tokio::test]
    async fn price_comparison_skips_local_catalog_and_needs_a_name() {
        let engine = default_engine();
        assert_eq!(
            engine.compare_prices(" ").await.expect_err("name required"),
            DomainError::EmptyQuery
        );
        assert!(engine.compare_prices("ASUS VivoBook 15").await.expect("compare").is_empty());
    }

    #[test]
    fn unknown_builtin_source_is_none() {
        assert!(builtin_source("ebay").is_none());
        assert_eq!(default_engine().source_names(), vec!["local", "amazon", "flipkart"]);
    }
}
