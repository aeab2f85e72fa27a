use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source names the service knows how to build.
pub const KNOWN_SOURCES: [&str; 3] = ["local", "amazon", "flipkart"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub stores: StoresConfig,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StoresConfig {
    /// Catalog sources queried per request, in merge order.
    pub sources: Vec<String>,
    pub per_source_limit: usize,
    pub timeout_ms: u64,
    pub affiliate: AffiliateConfig,
}

/// Live marketplace API. When enabled it replaces the simulated flipkart
/// listings.
#[derive(Clone, Debug)]
pub struct AffiliateConfig {
    pub enabled: bool,
    pub api_base: Option<String>,
    pub affiliate_id: Option<String>,
    pub affiliate_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub dedup_threshold: f64,
    pub keywords_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub sources: Option<Vec<String>>,
    pub keywords_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://shopsage.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            stores: StoresConfig {
                sources: KNOWN_SOURCES.iter().map(|name| (*name).to_string()).collect(),
                per_source_limit: 20,
                timeout_ms: 3_000,
                affiliate: AffiliateConfig {
                    enabled: false,
                    api_base: None,
                    affiliate_id: None,
                    affiliate_token: None,
                },
            },
            recommendation: RecommendationConfig {
                default_limit: 3,
                max_limit: 20,
                dedup_threshold: 0.8,
                keywords_path: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopsage.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(stores) = patch.stores {
            if let Some(sources) = stores.sources {
                self.stores.sources = sources;
            }
            if let Some(per_source_limit) = stores.per_source_limit {
                self.stores.per_source_limit = per_source_limit;
            }
            if let Some(timeout_ms) = stores.timeout_ms {
                self.stores.timeout_ms = timeout_ms;
            }
            if let Some(affiliate) = stores.affiliate {
                if let Some(enabled) = affiliate.enabled {
                    self.stores.affiliate.enabled = enabled;
                }
                if let Some(api_base) = affiliate.api_base {
                    self.stores.affiliate.api_base = Some(api_base);
                }
                if let Some(affiliate_id) = affiliate.affiliate_id {
                    self.stores.affiliate.affiliate_id = Some(affiliate_id);
                }
                if let Some(token) = affiliate.affiliate_token {
                    self.stores.affiliate.affiliate_token = Some(secret_value(token));
                }
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(default_limit) = recommendation.default_limit {
                self.recommendation.default_limit = default_limit;
            }
            if let Some(max_limit) = recommendation.max_limit {
                self.recommendation.max_limit = max_limit;
            }
            if let Some(dedup_threshold) = recommendation.dedup_threshold {
                self.recommendation.dedup_threshold = dedup_threshold;
            }
            if let Some(keywords_path) = recommendation.keywords_path {
                self.recommendation.keywords_path = Some(keywords_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPSAGE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SHOPSAGE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SHOPSAGE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SHOPSAGE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SHOPSAGE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPSAGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SHOPSAGE_SERVER_PORT") {
            self.server.port = parse_u16("SHOPSAGE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SHOPSAGE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SHOPSAGE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPSAGE_STORES_SOURCES") {
            self.stores.sources = split_list(&value);
        }
        if let Some(value) = read_env("SHOPSAGE_STORES_PER_SOURCE_LIMIT") {
            self.stores.per_source_limit =
                parse_u32("SHOPSAGE_STORES_PER_SOURCE_LIMIT", &value)? as usize;
        }
        if let Some(value) = read_env("SHOPSAGE_STORES_TIMEOUT_MS") {
            self.stores.timeout_ms = parse_u64("SHOPSAGE_STORES_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("SHOPSAGE_AFFILIATE_ENABLED") {
            self.stores.affiliate.enabled = parse_bool("SHOPSAGE_AFFILIATE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SHOPSAGE_AFFILIATE_API_BASE") {
            self.stores.affiliate.api_base = Some(value);
        }
        if let Some(value) = read_env("SHOPSAGE_AFFILIATE_ID") {
            self.stores.affiliate.affiliate_id = Some(value);
        }
        if let Some(value) = read_env("SHOPSAGE_AFFILIATE_TOKEN") {
            self.stores.affiliate.affiliate_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("SHOPSAGE_RECOMMENDATION_DEFAULT_LIMIT") {
            self.recommendation.default_limit =
                parse_u32("SHOPSAGE_RECOMMENDATION_DEFAULT_LIMIT", &value)? as usize;
        }
        if let Some(value) = read_env("SHOPSAGE_RECOMMENDATION_MAX_LIMIT") {
            self.recommendation.max_limit =
                parse_u32("SHOPSAGE_RECOMMENDATION_MAX_LIMIT", &value)? as usize;
        }
        if let Some(value) = read_env("SHOPSAGE_RECOMMENDATION_DEDUP_THRESHOLD") {
            self.recommendation.dedup_threshold =
                parse_f64("SHOPSAGE_RECOMMENDATION_DEDUP_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("SHOPSAGE_RECOMMENDATION_KEYWORDS_PATH") {
            self.recommendation.keywords_path = Some(PathBuf::from(value));
        }

        let log_level =
            read_env("SHOPSAGE_LOGGING_LEVEL").or_else(|| read_env("SHOPSAGE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPSAGE_LOGGING_FORMAT").or_else(|| read_env("SHOPSAGE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(sources) = overrides.sources {
            self.stores.sources = sources;
        }
        if let Some(keywords_path) = overrides.keywords_path {
            self.recommendation.keywords_path = Some(keywords_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_stores(&self.stores)?;
        validate_recommendation(&self.recommendation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("shopsage.toml"), PathBuf::from("config/shopsage.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_stores(stores: &StoresConfig) -> Result<(), ConfigError> {
    if stores.sources.is_empty() {
        return Err(ConfigError::Validation(
            "stores.sources must name at least one catalog source".to_string(),
        ));
    }
    if let Some(unknown) = stores.sources.iter().find(|name| !KNOWN_SOURCES.contains(&name.as_str()))
    {
        return Err(ConfigError::Validation(format!(
            "stores.sources contains unknown source `{unknown}` (expected local|amazon|flipkart)"
        )));
    }

    if stores.per_source_limit == 0 {
        return Err(ConfigError::Validation(
            "stores.per_source_limit must be greater than zero".to_string(),
        ));
    }

    if stores.timeout_ms == 0 || stores.timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "stores.timeout_ms must be in range 1..=60000".to_string(),
        ));
    }

    let affiliate = &stores.affiliate;
    if affiliate.enabled {
        let base = affiliate.api_base.as_deref().unwrap_or_default();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ConfigError::Validation(
                "stores.affiliate.api_base must start with http:// or https:// when enabled"
                    .to_string(),
            ));
        }
        let missing_credentials = affiliate.affiliate_id.as_deref().map_or(true, str::is_empty)
            || affiliate
                .affiliate_token
                .as_ref()
                .map_or(true, |token| token.expose_secret().trim().is_empty());
        if missing_credentials {
            return Err(ConfigError::Validation(
                "stores.affiliate is enabled but affiliate_id or affiliate_token is missing"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if recommendation.max_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendation.max_limit must be greater than zero".to_string(),
        ));
    }

    if recommendation.default_limit == 0
        || recommendation.default_limit > recommendation.max_limit
    {
        return Err(ConfigError::Validation(
            "recommendation.default_limit must be in range 1..=max_limit".to_string(),
        ));
    }

    let threshold = recommendation.dedup_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::Validation(
            "recommendation.dedup_threshold must be in range (0, 1]".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    stores: Option<StoresPatch>,
    recommendation: Option<RecommendationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StoresPatch {
    sources: Option<Vec<String>>,
    per_source_limit: Option<usize>,
    timeout_ms: Option<u64>,
    affiliate: Option<AffiliatePatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AffiliatePatch {
    enabled: Option<bool>,
    api_base: Option<String>,
    affiliate_id: Option<String>,
    affiliate_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    default_limit: Option<usize>,
    max_limit: Option<usize>,
    dedup_threshold: Option<f64>,
    keywords_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
