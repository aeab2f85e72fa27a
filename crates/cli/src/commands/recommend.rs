use serde::Serialize;
use shopsage_core::config::{AppConfig, LoadOptions};
use shopsage_core::errors::DomainError;
use shopsage_core::recommend::explanation::group_thousands;
use shopsage_core::recommend::{
    builtin_source, Recommendation, RecommendationEngine, RecommendationRequest,
};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct RecommendPayload<'a> {
    command: &'static str,
    status: &'static str,
    query: &'a str,
    #[serde(flatten)]
    recommendation: &'a Recommendation,
}

/// Ranks listings from the configured in-process sources. The live
/// marketplace API is only wired by the server.
pub fn run(query: &str, limit: Option<usize>, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let sources = config.stores.sources.iter().filter_map(|name| builtin_source(name)).collect();
    let engine = match RecommendationEngine::from_config(&config, sources) {
        Ok(engine) => engine,
        Err(error) => {
            return CommandResult::failure("recommend", "keyword_tables", error.to_string(), 2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let mut request = RecommendationRequest::new(query);
    if let Some(limit) = limit {
        request = request.with_limit(limit);
    }

    let recommendation = match runtime.block_on(engine.recommend(request)) {
        Ok(recommendation) => recommendation,
        Err(error @ DomainError::EmptyQuery) => {
            return CommandResult::failure("recommend", "invalid_query", error.to_string(), 4);
        }
        Err(error @ DomainError::InvalidLimit) => {
            return CommandResult::failure("recommend", "invalid_limit", error.to_string(), 4);
        }
        Err(error) => {
            return CommandResult::failure("recommend", "processing", error.to_string(), 5);
        }
    };

    let query = query.trim();
    let output = if json_output {
        let payload =
            RecommendPayload { command: "recommend", status: "ok", query, recommendation: &recommendation };
        match serde_json::to_string_pretty(&payload) {
            Ok(output) => output,
            Err(error) => {
                return CommandResult::failure("recommend", "serialization", error.to_string(), 5);
            }
        }
    } else {
        render_human(query, &recommendation)
    };

    CommandResult { exit_code: 0, output }
}

fn render_human(query: &str, recommendation: &Recommendation) -> String {
    let mut lines = vec![format!(
        "{} recommendation(s) from {} candidate(s) for \"{query}\"",
        recommendation.products.len(),
        recommendation.candidate_count
    )];

    for (position, product) in recommendation.products.iter().enumerate() {
        lines.push(format!(
            "{}. {} [{}] ₹{} rated {:.1}",
            position + 1,
            product.name,
            product.store,
            group_thousands(product.price),
            product.rating
        ));
        if let Some(explanation) = &product.explanation {
            lines.push(format!("   {explanation}"));
        }
    }

    lines.join("\n")
}
