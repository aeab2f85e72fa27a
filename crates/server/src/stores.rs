//! Live marketplace lookups over the flipkart affiliate API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use shopsage_core::catalog::MockStore;
use shopsage_core::config::AffiliateConfig;
use shopsage_core::domain::product::{Category, Feature, FeatureLevel, Product, ProductId};
use shopsage_core::recommend::{CatalogSource, SourceError, SourceRequest};

const STORE_NAME: &str = "flipkart";
const TITLE_TAGS: [&str; 7] =
    ["gaming", "business", "student", "portable", "lightweight", "powerful", "budget"];

pub struct AffiliateApiSource {
    client: Client,
    api_base: String,
    affiliate_id: String,
    affiliate_token: SecretString,
}

impl AffiliateApiSource {
    pub fn new(
        api_base: impl Into<String>,
        affiliate_id: impl Into<String>,
        affiliate_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            affiliate_id: affiliate_id.into(),
            affiliate_token,
        })
    }

    /// `None` unless the config enables the API and carries credentials.
    pub fn from_config(
        config: &AffiliateConfig,
        timeout: Duration,
    ) -> Result<Option<Self>, reqwest::Error> {
        let (Some(api_base), Some(affiliate_id), Some(token)) =
            (&config.api_base, &config.affiliate_id, &config.affiliate_token)
        else {
            return Ok(None);
        };
        if !config.enabled {
            return Ok(None);
        }
        Self::new(api_base.clone(), affiliate_id.clone(), token.clone(), timeout).map(Some)
    }
}

#[async_trait]
impl CatalogSource for AffiliateApiSource {
    fn name(&self) -> &str {
        STORE_NAME
    }

    async fn search(&self, request: &SourceRequest) -> Result<Vec<Product>, SourceError> {
        let query = format!("laptops {}", request.query).trim().to_string();
        let response = self
            .client
            .get(format!("{}/flipkart/product/search", self.api_base))
            .query(&[("query", query), ("resultCount", request.limit.to_string())])
            .header("Fk-Affiliate-Id", &self.affiliate_id)
            .header("Fk-Affiliate-Token", self.affiliate_token.expose_secret())
            .send()
            .await
            .map_err(|error| SourceError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let payload: SearchResponse =
            response.json().await.map_err(|error| SourceError::Malformed(error.to_string()))?;
        Ok(payload.products.into_iter().filter_map(ApiProduct::into_product).collect())
    }

    fn fallback(&self, request: &SourceRequest) -> Vec<Product> {
        let mut listings = MockStore::Flipkart.listings(&request.query);
        listings.truncate(request.limit);
        listings
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<ApiProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProduct {
    product_id: Option<String>,
    product_base_info_v1: Option<BaseInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseInfo {
    title: Option<String>,
    flipkart_selling_price: Option<Amount>,
    flipkart_special_price: Option<Amount>,
    product_rating: Option<Value>,
    product_url: Option<String>,
    #[serde(default)]
    product_specifications: Vec<Specification>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    amount: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Specification {
    key: String,
    #[serde(default)]
    values: Vec<SpecValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpecValue {
    Keyed { value: String },
    Plain(String),
}

impl SpecValue {
    fn as_str(&self) -> &str {
        match self {
            Self::Keyed { value } | Self::Plain(value) => value,
        }
    }
}

impl ApiProduct {
    fn into_product(self) -> Option<Product> {
        let id = self.product_id.filter(|id| !id.trim().is_empty())?;
        let info = self.product_base_info_v1.unwrap_or_default();
        let title = info.title.filter(|title| !title.trim().is_empty()).unwrap_or_else(|| "Laptop".to_string());

        let price = info.flipkart_selling_price.as_ref().and_then(amount_of).unwrap_or(0);
        let original_price =
            info.flipkart_special_price.as_ref().and_then(amount_of).filter(|amount| *amount > 0);
        let rating = info.product_rating.as_ref().and_then(number_of).unwrap_or(0.0);

        Some(
            Product {
                id: ProductId(id),
                category: category_from_title(&title),
                tags: tags_from_title(&title),
                features: features_from_specs(&info.product_specifications),
                specs: specs_from(&info.product_specifications),
                name: title,
                price,
                original_price,
                rating,
                store: STORE_NAME.to_string(),
                affiliate_url: info.product_url.filter(|url| !url.is_empty()),
            }
            .sanitized(),
        )
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn amount_of(price: &Amount) -> Option<u64> {
    price.amount.as_ref().and_then(number_of).filter(|amount| *amount >= 0.0).map(|amount| amount.round() as u64)
}

fn category_from_title(title: &str) -> Category {
    let lowered = title.to_lowercase();
    let mentions = |words: [&str; 2]| words.iter().any(|word| lowered.contains(word));

    if mentions(["gaming", "rgb"]) {
        Category::Gaming
    } else if mentions(["business", "office"]) {
        Category::Office
    } else if mentions(["student", "education"]) {
        Category::Student
    } else if mentions(["developer", "workstation"]) {
        Category::Coding
    } else {
        Category::Office
    }
}

fn tags_from_title(title: &str) -> Vec<String> {
    let lowered = title.to_lowercase();
    TITLE_TAGS.iter().filter(|tag| lowered.contains(*tag)).map(|tag| (*tag).to_string()).collect()
}

fn specs_from(specifications: &[Specification]) -> BTreeMap<String, String> {
    specifications
        .iter()
        .filter_map(|spec| {
            let value = spec.values.first()?;
            let key = match spec.key.as_str() {
                "RAM" | "RAM Capacity" => "ram".to_string(),
                "Storage" | "Hard Drive Capacity" => "storage".to_string(),
                "Processor" | "Processor Name" => "processor".to_string(),
                "Graphics" => "graphics".to_string(),
                other => other.to_lowercase(),
            };
            Some((key, value.as_str().to_string()))
        })
        .collect()
}

fn features_from_specs(specifications: &[Specification]) -> BTreeMap<Feature, FeatureLevel> {
    let mut features: BTreeMap<Feature, FeatureLevel> =
        Feature::ALL.into_iter().map(|feature| (feature, FeatureLevel::Medium)).collect();

    for spec in specifications {
        let value = spec.values.first().map(|value| value.as_str().to_lowercase()).unwrap_or_default();
        if ["16gb", "32gb", "i7", "ryzen 7"].iter().any(|marker| value.contains(marker)) {
            features.insert(Feature::Performance, FeatureLevel::High);
        }
        if ["lightweight", "thin", "ultrabook"].iter().any(|marker| value.contains(marker)) {
            features.insert(Feature::Weight, FeatureLevel::Light);
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use shopsage_core::domain::product::{Category, Feature, FeatureLevel};
    use shopsage_core::recommend::sources::fetch_guarded;
    use shopsage_core::recommend::{CatalogSource, QuerySignals, SourceRequest};

    use super::{AffiliateApiSource, SearchResponse};

    fn request(query: &str) -> SourceRequest {
        SourceRequest { query: query.to_string(), limit: 5, signals: QuerySignals::default() }
    }

    fn fixture() -> Value {
        json!({
            "products": [
                {
                    "productId": "LAPGAME01",
                    "productBaseInfoV1": {
                        "title": "Acer Nitro 5 Gaming Laptop",
                        "flipkartSellingPrice": { "amount": 61990 },
                        "flipkartSpecialPrice": { "amount": "69990" },
                        "productRating": "4.4",
                        "productUrl": "https://dl.flipkart.com/dl/acer-nitro",
                        "productSpecifications": [
                            { "key": "RAM Capacity", "values": [{ "value": "16GB" }] },
                            { "key": "Processor Name", "values": ["Ryzen 7 5800H"] },
                            { "key": "Weight", "values": [] }
                        ]
                    }
                },
                {
                    "productId": "LAPTHIN02",
                    "productBaseInfoV1": {
                        "title": "Zenbook Thin Student Edition",
                        "flipkartSellingPrice": { "amount": 48000 },
                        "productSpecifications": [
                            { "key": "Form", "values": [{ "value": "Thin and Lightweight" }] }
                        ]
                    }
                },
                { "productBaseInfoV1": { "title": "No id, skipped" } }
            ]
        })
    }

    #[test]
    fn api_payload_maps_to_products() {
        let payload: SearchResponse = serde_json::from_value(fixture()).expect("fixture parses");
        let products: Vec<_> =
            payload.products.into_iter().filter_map(super::ApiProduct::into_product).collect();

        assert_eq!(products.len(), 2);
        let nitro = &products[0];
        assert_eq!(nitro.category, Category::Gaming);
        assert_eq!(nitro.price, 61_990);
        assert_eq!(nitro.original_price, Some(69_990));
        assert!((nitro.rating - 4.4).abs() < 1e-9);
        assert_eq!(nitro.tags, vec!["gaming".to_string()]);
        assert_eq!(nitro.specs.get("ram").map(String::as_str), Some("16GB"));
        assert_eq!(nitro.specs.get("processor").map(String::as_str), Some("Ryzen 7 5800H"));
        assert_eq!(nitro.feature(Feature::Performance), Some(FeatureLevel::High));

        let zenbook = &products[1];
        assert_eq!(zenbook.category, Category::Student);
        assert_eq!(zenbook.rating, 0.0);
        assert_eq!(zenbook.affiliate_url, None);
        assert_eq!(zenbook.feature(Feature::Weight), Some(FeatureLevel::Light));
        assert_eq!(zenbook.feature(Feature::Performance), Some(FeatureLevel::Medium));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    #[tokio::test]
    async fn search_sends_credentials_and_parses_listings() {
        let router = Router::new().route(
            "/flipkart/product/search",
            get(|headers: HeaderMap, Query(params): Query<Vec<(String, String)>>| async move {
                let authorized = headers.get("Fk-Affiliate-Id").is_some_and(|id| id == "aff-1")
                    && headers.get("Fk-Affiliate-Token").is_some_and(|token| token == "tok-1");
                let query_ok = params.contains(&("query".to_string(), "laptops gaming".to_string()))
                    && params.contains(&("resultCount".to_string(), "5".to_string()));
                if authorized && query_ok {
                    (StatusCode::OK, Json(fixture()))
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({})))
                }
            }),
        );
        let base = serve(router).await;
        let source =
            AffiliateApiSource::new(base, "aff-1", "tok-1".to_string().into(), Duration::from_secs(2))
                .expect("client");

        let listings = source.search(&request("gaming")).await.expect("search succeeds");
        assert_eq!(listings.len(), 2);
        assert!(listings.iter().all(|product| product.store == "flipkart"));
    }

    #[tokio::test]
    async fn failing_api_degrades_to_simulated_flipkart_listings() {
        let router = Router::new().route(
            "/flipkart/product/search",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
        let base = serve(router).await;
        let source =
            AffiliateApiSource::new(base, "aff-1", "tok-1".to_string().into(), Duration::from_secs(2))
                .expect("client");

        assert!(source.search(&request("gaming")).await.is_err());
        let listings = fetch_guarded(&source, &request("gaming"), Duration::from_secs(2)).await;
        let ids: Vec<_> = listings.iter().map(|product| product.id.as_str()).collect();
        assert_eq!(ids, vec!["fk-laptop-1", "fk-laptop-2"]);
    }
}
