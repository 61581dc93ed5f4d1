//! Structured logging for mf-core.
//!
//! Human lines for terminals, JSONL when stdout carries JSON or
//! `MEANFIELD_LOG_FORMAT=jsonl`. Both go to stderr.
//!
//! # Usage
//!
//! ```ignore
//! use mf_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id()).with_model("mixture");
//! let span = ctx.stage_span(Stage::Infer);
//! let _enter = span.enter();
//! tracing::info!(target: event_names::INFER_STARTED, message = "starting sweeps");
//! ```

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber on stderr.
///
/// A second call is a no-op.
pub fn init_logging(config: &LogConfig) {
    let filter = build_filter(config);

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal());
            let registry = tracing_subscriber::registry().with(filter);
            let _ = if config.timestamps {
                registry.with(fmt_layer).try_init()
            } else {
                registry.with(fmt_layer.without_time()).try_init()
            };
        }
        LogFormat::Jsonl => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .try_init();
        }
    }
}

/// Event names are the targets, so the default directive is a bare level
/// and `RUST_LOG` can address single events (`infer.sweep=trace`).
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .parse_lossy(config.directives.as_deref().unwrap_or(""))
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // First 12 hex chars are enough to correlate one run's lines
    format!("run-{}", &uuid.simple().to_string()[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();

        assert!(id1.starts_with("run-"));
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 16);
        assert!(id1[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn filter_uses_configured_level() {
        let config = LogConfig {
            level: LogLevel::Warn,
            ..LogConfig::default()
        };
        assert_eq!(build_filter(&config).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn filter_accepts_event_directives() {
        let config = LogConfig {
            level: LogLevel::Error,
            directives: Some("infer.sweep=trace".to_string()),
            ..LogConfig::default()
        };
        assert_eq!(build_filter(&config).max_level_hint(), Some(LevelFilter::TRACE));
    }
}
