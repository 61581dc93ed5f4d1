//! Structured event vocabulary for logging.
//!
//! Every event carries a run correlation ID and the pipeline stage it
//! belongs to. The event name doubles as the tracing target.

use serde::{Deserialize, Serialize};

/// Log levels for JSONL records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Stages of a single mf-core run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Reading and parsing the data file.
    Ingest,
    /// Declaring the model.
    Build,
    /// Variational sweeps.
    Infer,
    /// Rendering posterior summaries.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Ingest => "ingest",
            Stage::Build => "build",
            Stage::Infer => "infer",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const INGEST_FINISHED: &str = "ingest.finished";

    pub const MODEL_BUILT: &str = "model.built";

    pub const INFER_STARTED: &str = "infer.started";
    pub const INFER_SWEEP: &str = "infer.sweep";
    pub const INFER_ELBO_DECREASED: &str = "infer.elbo_decreased";
    pub const INFER_RESTART: &str = "infer.restart";
    pub const INFER_FINISHED: &str = "infer.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation data shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    /// Model being fitted, once known.
    pub model: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Span that tags nested events with this run and the given stage.
    pub fn stage_span(&self, stage: Stage) -> tracing::Span {
        tracing::info_span!(
            "stage",
            run_id = %self.run_id,
            stage = %stage,
            model = self.model.as_deref().unwrap_or("")
        )
    }
}
