pub mod config;
pub mod demo;
pub mod migrate;
pub mod rank;
pub mod seed;

use procura_core::errors::ApplicationError;
use procura_core::scoring::RankedBid;
use procura_engine::BootstrapError;
use serde::Serialize;

/// `(error_class, message, exit_code)` for a failed command step.
pub(crate) type StepFailure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub(crate) fn from_step(command: &str, outcome: Result<String, StepFailure>) -> Self {
        match outcome {
            Ok(message) => Self::success(command, message),
            Err((error_class, message, exit_code)) => {
                Self::failure(command, error_class, message, exit_code)
            }
        }
    }
}

pub(crate) fn current_thread_runtime() -> Result<tokio::runtime::Runtime, StepFailure> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        ("runtime_init", format!("failed to initialize async runtime: {error}"), 3)
    })
}

pub(crate) fn bootstrap_failure(error: BootstrapError) -> StepFailure {
    match error {
        BootstrapError::Config(error) => {
            ("config_validation", format!("configuration issue: {error}"), 2)
        }
        BootstrapError::DatabaseConnect(error) => ("db_connectivity", error.to_string(), 4),
        BootstrapError::Migration(error) => ("migration", error.to_string(), 5),
    }
}

pub(crate) fn engine_failure(error: ApplicationError) -> StepFailure {
    let error_class = error.error_class();
    let interface = error.into_interface("cli");
    let retry_hint = if interface.is_retryable() { " (retryable)" } else { "" };
    (error_class, format!("{interface}{retry_hint}"), 6)
}

pub(crate) fn render_ranking(ranked: &[RankedBid]) -> String {
    if ranked.is_empty() {
        return "  (no bids)".to_string();
    }
    ranked
        .iter()
        .map(|entry| {
            format!(
                "  {}. {} supplier={} amount={} delivery_days={} score={:.3}",
                entry.rank,
                entry.bid.id,
                entry.bid.supplier_id,
                entry.bid.bid_amount,
                entry.bid.delivery_time_days,
                entry.score.composite
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
