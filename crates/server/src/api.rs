use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use shopsage_core::domain::history::{SearchHistoryEntry, HISTORY_LIST_LIMIT};
use shopsage_core::domain::preferences::PreferenceRecord;
use shopsage_core::domain::product::{Category, ProductId};
use shopsage_core::domain::recommendation::RecommendedProduct;
use shopsage_core::domain::wishlist::WishlistItem;
use shopsage_core::errors::{ApplicationError, InterfaceError};
use shopsage_core::recommend::compare::PriceComparison;
use shopsage_core::recommend::suggestions::personalized_queries;
use shopsage_core::recommend::{
    ProductFilter, QuerySignals, RecommendationEngine, RecommendationFilters,
    RecommendationRequest,
};
use shopsage_db::repositories::{
    PreferenceRepository, RepositoryError, SearchHistoryRepository, WishlistRepository,
};

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<RecommendationEngine>,
    pub preferences: Arc<dyn PreferenceRepository>,
    pub history: Arc<dyn SearchHistoryRepository>,
    pub wishlist: Arc<dyn WishlistRepository>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub success: bool,
    pub message: String,
    pub correlation_id: String,
}

type Rejection = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<Json<T>, Rejection>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendBody {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub filters: RecommendationFilters,
    #[serde(default)]
    pub refine: ProductFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub success: bool,
    pub recommendations: Vec<RecommendedProduct>,
    pub interpreted: QuerySignals,
    pub total_found: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarParams {
    pub product_id: Option<String>,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareParams {
    pub product_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub product_name: String,
    pub comparisons: Vec<PriceComparison>,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WishlistAddResponse {
    pub added: bool,
    pub item: WishlistItem,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/ai-recommend", post(ai_recommend))
        .route("/api/similar", get(similar))
        .route("/api/trending", get(trending))
        .route("/api/compare-prices", get(compare_prices))
        .route(
            "/api/users/{user_id}/preferences",
            get(get_preferences).put(put_preferences).delete(reset_preferences),
        )
        .route("/api/users/{user_id}/history", get(list_history).delete(clear_history))
        .route("/api/users/{user_id}/suggestions", get(suggestions))
        .route("/api/users/{user_id}/wishlist", get(list_wishlist).post(add_to_wishlist))
        .route("/api/users/{user_id}/wishlist/{product_id}", delete(remove_from_wishlist))
        .with_state(state)
}

fn correlation_id() -> String {
    format!("req-{}", &Uuid::new_v4().simple().to_string()[..12])
}

fn reject_interface(interface: InterfaceError) -> Rejection {
    let (status, message) = match &interface {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        InterfaceError::ServiceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, interface.user_message().to_string())
        }
        InterfaceError::Internal { message, .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
        }
    };

    if status.is_server_error() {
        error!(
            event_name = "api.request.failed",
            correlation_id = interface.correlation_id(),
            error = %interface,
            "request failed"
        );
    }

    (
        status,
        Json(ApiError {
            success: false,
            message,
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

fn reject(error: impl Into<ApplicationError>, correlation_id: &str) -> Rejection {
    reject_interface(error.into().into_interface(correlation_id))
}

fn bad_request(message: impl Into<String>, correlation_id: &str) -> Rejection {
    reject_interface(InterfaceError::BadRequest {
        message: message.into(),
        correlation_id: correlation_id.to_string(),
    })
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

pub async fn ai_recommend(
    State(state): State<ApiState>,
    Json(body): Json<RecommendBody>,
) -> ApiResult<RecommendResponse> {
    let correlation_id = correlation_id();
    let query = body.query.unwrap_or_default();
    let user_id = body.user_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());

    let mut request =
        RecommendationRequest::new(query.clone()).with_filters(body.filters).with_refine(body.refine);
    if let Some(limit) = body.limit {
        request = request.with_limit(limit);
    }
    if let Some(user_id) = &user_id {
        match state.preferences.find(user_id).await {
            Ok(preferences) => request = request.with_preferences(preferences),
            Err(error) => warn!(
                event_name = "api.preferences.unavailable",
                correlation_id = %correlation_id,
                error = %error,
                "ranking without preferences"
            ),
        }
    }

    let recommendation =
        state.engine.recommend(request).await.map_err(|error| reject(error, &correlation_id))?;

    if let Some(user_id) = &user_id {
        record_search(&state, user_id, query.trim(), &recommendation.products, &correlation_id)
            .await;
    }

    info!(
        event_name = "api.recommend.completed",
        correlation_id = %correlation_id,
        result_count = recommendation.products.len(),
        "recommendations served"
    );

    Ok(Json(RecommendResponse {
        success: true,
        total_found: recommendation.candidate_count,
        interpreted: recommendation.signals,
        recommendations: recommendation.products,
    }))
}

/// History and preference upkeep after a served search. Failures are logged
/// and never change the response.
async fn record_search(
    state: &ApiState,
    user_id: &str,
    query: &str,
    results: &[RecommendedProduct],
    correlation_id: &str,
) {
    let entry = SearchHistoryEntry::record(user_id, query, results, Utc::now());
    if let Err(error) = state.history.append(entry).await {
        warn!(
            event_name = "api.history.append_failed",
            correlation_id = %correlation_id,
            error = %error,
            "search history not recorded"
        );
    }

    let updated = match state.preferences.find(user_id).await {
        Ok(mut preferences) => {
            preferences.merge(&PreferenceRecord::observed_results(results));
            state.preferences.save(user_id, &preferences).await
        }
        Err(error) => Err(error),
    };
    if let Err(error) = updated {
        warn!(
            event_name = "api.preferences.update_failed",
            correlation_id = %correlation_id,
            error = %error,
            "preferences not updated"
        );
    }
}

pub async fn similar(
    State(state): State<ApiState>,
    Query(params): Query<SimilarParams>,
) -> ApiResult<Vec<RecommendedProduct>> {
    let correlation_id = correlation_id();
    let category = match params.category.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(
            raw.parse::<Category>()
                .map_err(|error| bad_request(error.to_string(), &correlation_id))?,
        ),
        None => None,
    };
    let product_id = params
        .product_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(ProductId);

    let products = state
        .engine
        .similar(product_id.as_ref(), category, params.limit)
        .await
        .map_err(|error| reject(error, &correlation_id))?;
    Ok(Json(products))
}

pub async fn trending(
    State(state): State<ApiState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<RecommendedProduct>> {
    let correlation_id = correlation_id();
    let products =
        state.engine.trending(params.limit).await.map_err(|error| reject(error, &correlation_id))?;
    Ok(Json(products))
}

pub async fn compare_prices(
    State(state): State<ApiState>,
    Query(params): Query<CompareParams>,
) -> ApiResult<CompareResponse> {
    let correlation_id = correlation_id();
    let product_name = params.product_name.unwrap_or_default();
    let comparisons = state
        .engine
        .compare_prices(&product_name)
        .await
        .map_err(|error| reject(error, &correlation_id))?;
    Ok(Json(CompareResponse { product_name: product_name.trim().to_string(), comparisons }))
}

pub async fn get_preferences(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> ApiResult<PreferenceRecord> {
    let correlation_id = correlation_id();
    let record = state
        .preferences
        .find(&user_id)
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;
    Ok(Json(record))
}

/// Replaces the stored record. Malformed fields fall back to their defaults.
pub async fn put_preferences(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<PreferenceRecord> {
    let correlation_id = correlation_id();
    let record = PreferenceRecord::from_json(&payload);
    state
        .preferences
        .save(&user_id, &record)
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;
    Ok(Json(record))
}

pub async fn reset_preferences(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, Rejection> {
    let correlation_id = correlation_id();
    state
        .preferences
        .reset(&user_id)
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_history(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<SearchHistoryEntry>> {
    let correlation_id = correlation_id();
    let limit = params
        .limit
        .and_then(|limit| u32::try_from(limit).ok())
        .unwrap_or(HISTORY_LIST_LIMIT)
        .clamp(1, HISTORY_LIST_LIMIT);
    let entries = state
        .history
        .list(&user_id, limit)
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;
    Ok(Json(entries))
}

pub async fn clear_history(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> ApiResult<ClearedResponse> {
    let correlation_id = correlation_id();
    let removed = state
        .history
        .clear(&user_id)
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;
    Ok(Json(ClearedResponse { removed }))
}

pub async fn suggestions(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> ApiResult<SuggestionsResponse> {
    let correlation_id = correlation_id();
    let preferences = state
        .preferences
        .find(&user_id)
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;
    let history = state
        .history
        .list(&user_id, HISTORY_LIST_LIMIT)
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;
    Ok(Json(SuggestionsResponse { suggestions: personalized_queries(&preferences, &history) }))
}

pub async fn list_wishlist(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<WishlistItem>> {
    let correlation_id = correlation_id();
    let items = state
        .wishlist
        .list(&user_id)
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;
    Ok(Json(items))
}

pub async fn add_to_wishlist(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    Json(product): Json<RecommendedProduct>,
) -> Result<(StatusCode, Json<WishlistAddResponse>), Rejection> {
    let correlation_id = correlation_id();
    let item = WishlistItem::from_recommendation(&product, Utc::now());
    let added = state
        .wishlist
        .add(&user_id, item.clone())
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;

    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(WishlistAddResponse { added, item })))
}

pub async fn remove_from_wishlist(
    State(state): State<ApiState>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> Result<StatusCode, Rejection> {
    let correlation_id = correlation_id();
    let removed = state
        .wishlist
        .remove(&user_id, &ProductId(product_id))
        .await
        .map_err(|error| reject(persistence(error), &correlation_id))?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                success: false,
                message: "product is not on the wishlist".to_string(),
                correlation_id,
            }),
        ))
    }
}
