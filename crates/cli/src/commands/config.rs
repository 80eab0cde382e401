use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use procura_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let weights = config.scoring.weights;

    let fields: [(&str, String, &[&str]); 11] = [
        ("database.url", config.database.url.clone(), &["PROCURA_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PROCURA_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PROCURA_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "ledger.operation_timeout_ms",
            config.ledger.operation_timeout_ms.to_string(),
            &["PROCURA_LEDGER_OPERATION_TIMEOUT_MS"],
        ),
        ("scoring.price_weight", weights.price.to_string(), &["PROCURA_SCORING_PRICE_WEIGHT"]),
        (
            "scoring.delivery_weight",
            weights.delivery.to_string(),
            &["PROCURA_SCORING_DELIVERY_WEIGHT"],
        ),
        (
            "scoring.reputation_weight",
            weights.reputation.to_string(),
            &["PROCURA_SCORING_REPUTATION_WEIGHT"],
        ),
        (
            "scoring.over_budget_penalty",
            weights.over_budget_penalty.to_string(),
            &["PROCURA_SCORING_OVER_BUDGET_PENALTY"],
        ),
        (
            "scoring.default_top_k",
            config.scoring.default_top_k.to_string(),
            &["PROCURA_SCORING_DEFAULT_TOP_K"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["PROCURA_LOGGING_LEVEL", "PROCURA_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["PROCURA_LOGGING_FORMAT", "PROCURA_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in &fields {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    CommandResult::success("config", lines.join("\n"))
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("procura.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/procura.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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
