//! Logging utilities for Recall services.
//!
//! Structured logging goes through `tracing`; this module only installs the
//! subscriber at process start. Library crates emit events and never install
//! a subscriber themselves.
//!
//! # Noise Filtering
//!
//! Transport crates pulled in by the graph drivers (hyper, reqwest, rustls,
//! redis) are clamped to `warn` unless `RUST_LOG` overrides the filter.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Modules whose debug output is mostly connection bookkeeping.
pub const NOISY_MODULES: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "redis",
];

/// Output format for the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, with span context
    Json,
    /// Human-readable, colored output
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("Unknown log format: {other}")),
        }
    }
}

/// Build the filter directive string for a base level plus clamped modules.
fn directives(log_level: &str, extra_targets: &[String]) -> String {
    let mut directives = String::from(log_level);

    for module in NOISY_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }
    for target in extra_targets {
        directives.push_str(&format!(",{target}=warn"));
    }

    directives
}

fn build_filter(log_level: &str, extra_targets: &[String]) -> EnvFilter {
    // RUST_LOG wins when set
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(log_level, extra_targets)))
}

/// Initialize logging.
///
/// Safe to call more than once; later calls are ignored by the global
/// subscriber registry.
pub fn init_logging(log_level: &str, format: LogFormat) {
    init_logging_with_exclusions(log_level, format, &[]);
}

/// Initialize logging, clamping additional targets to `warn`.
pub fn init_logging_with_exclusions(log_level: &str, format: LogFormat, excluded_targets: &[String]) {
    let filter = build_filter(log_level, excluded_targets);
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            let _ = subscriber.with(fmt_layer).try_init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(true)
                .with_file(false)
                .with_line_number(false);
            let _ = subscriber.with(fmt_layer).try_init();
        }
    }

    tracing::info!(
        log_level = %log_level,
        log_format = ?format,
        noise_filtered = NOISY_MODULES.len() + excluded_targets.len(),
        "Logging initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn directives_clamp_noisy_modules() {
        let d = directives("debug", &[]);
        assert!(d.starts_with("debug,"));
        assert!(d.contains("reqwest=warn"));
        assert!(d.contains("redis=warn"));
    }

    #[test]
    fn directives_include_extra_targets() {
        let d = directives("info", &["recall_graph::backend".to_string()]);
        assert!(d.ends_with(",recall_graph::backend=warn"));
    }

    #[test_case("json", LogFormat::Json)]
    #[test_case("JSON", LogFormat::Json)]
    #[test_case("pretty", LogFormat::Pretty)]
    #[test_case(" text ", LogFormat::Pretty)]
    fn log_format_parses(input: &str, expected: LogFormat) {
        assert_eq!(input.parse::<LogFormat>().unwrap(), expected);
    }

    #[test]
    fn log_format_rejects_unknown() {
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn init_logging_twice_does_not_panic() {
        init_logging("warn", LogFormat::Pretty);
        init_logging("warn", LogFormat::Json);
    }
}
