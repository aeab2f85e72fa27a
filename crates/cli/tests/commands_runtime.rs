use std::env;
use std::sync::{Mutex, OnceLock};

use shopsage_cli::commands::{config, doctor, migrate, recommend};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn recommend_returns_ranked_json_with_default_env() {
    with_env(&[], || {
        let result = recommend::run("gaming laptop under 60000", None, true);
        assert_eq!(result.exit_code, 0, "expected successful recommendation run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["candidateCount"], 12);
        assert_eq!(payload["signals"]["category"], "gaming");

        let products = payload["products"].as_array().expect("products array");
        assert_eq!(products.len(), 3);
        assert_eq!(products[0]["name"], "Budget Gaming Laptop");
        assert!(products.iter().all(|product| product.get("relevanceScore").is_none()));
    });
}

#[test]
fn recommend_honors_source_selection_and_limit() {
    with_env(&[("SHOPSAGE_STORES_SOURCES", "local")], || {
        let result = recommend::run("office laptop", Some(2), false);
        assert_eq!(result.exit_code, 0, "expected successful recommendation run");

        assert!(result.output.starts_with("2 recommendation(s) from 8 candidate(s)"));
        assert!(result.output.contains("1. "));
        assert!(result.output.contains("[local]"));
        assert!(!result.output.contains("[amazon]"));
    });
}

#[test]
fn recommend_rejects_blank_queries() {
    with_env(&[], || {
        let result = recommend::run("   ", None, true);
        assert_eq!(result.exit_code, 4, "expected invalid query code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_query");
        assert_eq!(payload["message"], "query required");
    });
}

#[test]
fn recommend_rejects_a_zero_limit() {
    with_env(&[], || {
        let result = recommend::run("office laptop", Some(0), true);
        assert_eq!(result.exit_code, 4, "expected invalid limit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_limit");
        assert_eq!(payload["message"], "limit must be at least 1");
    });
}

#[test]
fn recommend_returns_config_failure_for_unknown_source() {
    with_env(&[("SHOPSAGE_STORES_SOURCES", "local,ebay")], || {
        let result = recommend::run("laptop", None, true);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("SHOPSAGE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "applied 3 pending migration(s)");
    });
}

#[test]
fn doctor_passes_after_migrate_on_file_database() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("doctor.db").display());

    with_env(&[("SHOPSAGE_DATABASE_URL", url.as_str())], || {
        let before = doctor::run(true);
        assert_eq!(before.exit_code, 1, "fresh database should report pending migrations");
        let report = parse_payload(&before.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(check_status(&report, "database_connectivity"), "pass");
        assert_eq!(check_status(&report, "migrations"), "fail");

        assert_eq!(migrate::run().exit_code, 0);
        let second = parse_payload(&migrate::run().output);
        assert_eq!(second["message"], "schema already up to date");

        let after = doctor::run(true);
        assert_eq!(after.exit_code, 0, "expected all checks to pass");
        let report = parse_payload(&after.output);
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(check_status(&report, "keyword_tables"), "pass");
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_invalid() {
    with_env(&[("SHOPSAGE_RECOMMENDATION_DEDUP_THRESHOLD", "1.5")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] keyword_tables"));
        assert!(result.output.contains("- [skip] migrations"));
    });
}

#[test]
fn config_attributes_sources_and_redacts_tokens() {
    with_env(
        &[
            ("SHOPSAGE_AFFILIATE_ENABLED", "true"),
            ("SHOPSAGE_AFFILIATE_API_BASE", "https://affiliate.example.test/api"),
            ("SHOPSAGE_AFFILIATE_ID", "shopsage-dev"),
            ("SHOPSAGE_AFFILIATE_TOKEN", "fk-secret-token-value"),
            ("SHOPSAGE_LOG_LEVEL", "debug"),
        ],
        || {
            let output = config::run();

            assert!(output.contains(
                "- stores.affiliate.affiliate_token = fk-s*** (source: env (SHOPSAGE_AFFILIATE_TOKEN))"
            ));
            assert!(!output.contains("fk-secret-token-value"));
            assert!(output.contains("- logging.level = debug (source: env (SHOPSAGE_LOG_LEVEL))"));
            assert!(output.contains("- server.port = 8080 (source: default)"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn check_status<'a>(report: &'a Value, name: &str) -> &'a str {
    report["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .and_then(|check| check["status"].as_str())
        .unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SHOPSAGE_DATABASE_URL",
        "SHOPSAGE_DATABASE_MAX_CONNECTIONS",
        "SHOPSAGE_DATABASE_TIMEOUT_SECS",
        "SHOPSAGE_SERVER_BIND_ADDRESS",
        "SHOPSAGE_SERVER_PORT",
        "SHOPSAGE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SHOPSAGE_STORES_SOURCES",
        "SHOPSAGE_STORES_PER_SOURCE_LIMIT",
        "SHOPSAGE_STORES_TIMEOUT_MS",
        "SHOPSAGE_AFFILIATE_ENABLED",
        "SHOPSAGE_AFFILIATE_API_BASE",
        "SHOPSAGE_AFFILIATE_ID",
        "SHOPSAGE_AFFILIATE_TOKEN",
        "SHOPSAGE_RECOMMENDATION_DEFAULT_LIMIT",
        "SHOPSAGE_RECOMMENDATION_MAX_LIMIT",
        "SHOPSAGE_RECOMMENDATION_DEDUP_THRESHOLD",
        "SHOPSAGE_RECOMMENDATION_KEYWORDS_PATH",
        "SHOPSAGE_LOGGING_LEVEL",
        "SHOPSAGE_LOGGING_FORMAT",
        "SHOPSAGE_LOG_LEVEL",
        "SHOPSAGE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
