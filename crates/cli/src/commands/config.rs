use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use shopsage_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let affiliate = &config.stores.affiliate;
    let affiliate_token = affiliate
        .affiliate_token
        .as_ref()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        Field::new("database.url", config.database.url.clone(), &["SHOPSAGE_DATABASE_URL"]),
        Field::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["SHOPSAGE_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["SHOPSAGE_DATABASE_TIMEOUT_SECS"],
        ),
        Field::new(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["SHOPSAGE_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", config.server.port.to_string(), &["SHOPSAGE_SERVER_PORT"]),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["SHOPSAGE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new("stores.sources", config.stores.sources.join(","), &["SHOPSAGE_STORES_SOURCES"]),
        Field::new(
            "stores.per_source_limit",
            config.stores.per_source_limit.to_string(),
            &["SHOPSAGE_STORES_PER_SOURCE_LIMIT"],
        ),
        Field::new(
            "stores.timeout_ms",
            config.stores.timeout_ms.to_string(),
            &["SHOPSAGE_STORES_TIMEOUT_MS"],
        ),
        Field::new(
            "stores.affiliate.enabled",
            affiliate.enabled.to_string(),
            &["SHOPSAGE_AFFILIATE_ENABLED"],
        ),
        Field::new(
            "stores.affiliate.api_base",
            affiliate.api_base.as_deref().unwrap_or("<unset>"),
            &["SHOPSAGE_AFFILIATE_API_BASE"],
        ),
        Field::new(
            "stores.affiliate.affiliate_id",
            affiliate.affiliate_id.as_deref().unwrap_or("<unset>"),
            &["SHOPSAGE_AFFILIATE_ID"],
        ),
        Field::new("stores.affiliate.affiliate_token", affiliate_token, &["SHOPSAGE_AFFILIATE_TOKEN"]),
        Field::new(
            "recommendation.default_limit",
            config.recommendation.default_limit.to_string(),
            &["SHOPSAGE_RECOMMENDATION_DEFAULT_LIMIT"],
        ),
        Field::new(
            "recommendation.max_limit",
            config.recommendation.max_limit.to_string(),
            &["SHOPSAGE_RECOMMENDATION_MAX_LIMIT"],
        ),
        Field::new(
            "recommendation.dedup_threshold",
            config.recommendation.dedup_threshold.to_string(),
            &["SHOPSAGE_RECOMMENDATION_DEDUP_THRESHOLD"],
        ),
        Field::new(
            "recommendation.keywords_path",
            config
                .recommendation
                .keywords_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<built-in>".to_string()),
            &["SHOPSAGE_RECOMMENDATION_KEYWORDS_PATH"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.clone(),
            &["SHOPSAGE_LOGGING_LEVEL", "SHOPSAGE_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SHOPSAGE_LOGGING_FORMAT", "SHOPSAGE_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["shopsage.toml", "config/shopsage.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the first four characters of long tokens so operators can tell
/// credentials apart without exposing them.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() > 12 {
        let prefix: String = trimmed.chars().take(4).collect();
        return format!("{prefix}***");
    }

    "<redacted>".to_string()
}
