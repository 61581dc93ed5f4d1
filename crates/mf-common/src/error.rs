//! Error types for meanfield.
//!
//! Every failure the engine can report is a variant of [`Error`], carrying:
//! - A stable error code for machine parsing
//! - A category for grouping
//! - A headline and remediation hint for humans
//!
//! None of the modelling errors are retryable: the same input and the same
//! settings fail the same way again.
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Input Parse Error
//!   Reason: parse error at line 3, column 2: "abc" is not a finite number
//!   Fix: Data files hold comma- or newline-separated finite numbers. ...
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "input",
//!   "message": "parse error at line 3, column 2: \"abc\" is not a finite number",
//!   "retryable": false,
//!   "context": { "line": 3, "column": 2, "token": "abc" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias for meanfield operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid model configuration or hyperparameters.
    Config,
    /// Malformed input data.
    Input,
    /// Variational inference and numerical errors.
    Inference,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Inference => write!(f, "inference"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for meanfield.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("plate '{plate}' declares {expected} items but {actual} were bound")]
    PlateMismatch {
        plate: String,
        expected: usize,
        actual: usize,
    },

    // Input errors (20-29)
    #[error("parse error at line {line}, column {column}: {token:?} is not a finite number")]
    Parse {
        line: usize,
        column: usize,
        token: String,
    },

    // Inference errors (30-39)
    #[error("numerical instability in '{variable}' at iteration {iteration}: {detail}")]
    NumericalInstability {
        variable: String,
        iteration: usize,
        detail: String,
    },

    #[error("inference error: {0}")]
    Inference(String),

    // I/O errors (40-49)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Input errors
    /// - 30-39: Inference errors
    /// - 40-49: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::PlateMismatch { .. } => 11,
            Error::Parse { .. } => 20,
            Error::NumericalInstability { .. } => 30,
            Error::Inference(_) => 31,
            Error::Io(_) => 40,
            Error::Json(_) => 41,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::PlateMismatch { .. } => ErrorCategory::Config,
            Error::Parse { .. } => ErrorCategory::Input,
            Error::NumericalInstability { .. } | Error::Inference(_) => ErrorCategory::Inference,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Only I/O failures can be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Check hyperparameters: precisions, Gamma shape/rate and Dirichlet concentrations must be finite and positive, k >= 1, and data must be non-empty."
            }
            Error::PlateMismatch { .. } => {
                "The declared sample size does not match the data. Fix --expected-n or the data file."
            }
            Error::Parse { .. } => {
                "Data files hold comma- or newline-separated finite numbers. Remove the offending token or empty field."
            }
            Error::NumericalInstability { .. } => {
                "A posterior parameter became NaN or infinite. Rescale the data or use less extreme priors."
            }
            Error::Inference(_) => {
                "Internal inference error. Re-run with -vv and report the log."
            }
            Error::Io(_) => "Check that the file exists and is readable, then retry.",
            Error::Json(_) => {
                "Invalid JSON. Check syntax with 'jq . <file>' or regenerate the file."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::PlateMismatch { .. } => "Plate Size Mismatch",
            Error::Parse { .. } => "Input Parse Error",
            Error::NumericalInstability { .. } => "Numerical Instability",
            Error::Inference(_) => "Inference Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    pub retryable: bool,

    /// Additional structured context (e.g., line, variable).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        let mut context = BTreeMap::new();

        match err {
            Error::Parse {
                line,
                column,
                token,
            } => {
                context.insert("line".to_string(), serde_json::json!(line));
                context.insert("column".to_string(), serde_json::json!(column));
                context.insert("token".to_string(), serde_json::json!(token));
            }
            Error::PlateMismatch {
                plate,
                expected,
                actual,
            } => {
                context.insert("plate".to_string(), serde_json::json!(plate));
                context.insert("expected".to_string(), serde_json::json!(expected));
                context.insert("actual".to_string(), serde_json::json!(actual));
            }
            Error::NumericalInstability {
                variable,
                iteration,
                ..
            } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
                context.insert("iteration".to_string(), serde_json::json!(iteration));
            }
            _ => {}
        }

        ErrorResponse {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            context,
        }
    }
}

impl ErrorResponse {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error() -> Error {
        Error::Parse {
            line: 3,
            column: 2,
            token: "abc".into(),
        }
    }

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("k must be >= 1".into()).code(), 10);
        assert_eq!(parse_error().code(), 20);
        assert_eq!(
            Error::NumericalInstability {
                variable: "mean".into(),
                iteration: 4,
                detail: "NaN".into()
            }
            .code(),
            30
        );
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::Config("x".into()).category(), ErrorCategory::Config);
        assert_eq!(
            Error::PlateMismatch {
                plate: "n".into(),
                expected: 10,
                actual: 9
            }
            .category(),
            ErrorCategory::Config
        );
        assert_eq!(parse_error().category(), ErrorCategory::Input);
        assert_eq!(
            Error::Inference("x".into()).category(),
            ErrorCategory::Inference
        );
    }

    #[test]
    fn test_modelling_errors_not_retryable() {
        assert!(!Error::Config("x".into()).is_retryable());
        assert!(!parse_error().is_retryable());
        assert!(!Error::NumericalInstability {
            variable: "precision[0]".into(),
            iteration: 1,
            detail: "rate".into()
        }
        .is_retryable());
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::Interrupted, "eintr"));
        assert!(io.is_retryable());
    }

    #[test]
    fn test_parse_error_message() {
        let msg = parse_error().to_string();
        assert_eq!(
            msg,
            "parse error at line 3, column 2: \"abc\" is not a finite number"
        );
    }

    #[test]
    fn test_error_response_context() {
        let response = ErrorResponse::from(&parse_error());
        assert_eq!(response.code, 20);
        assert_eq!(response.category, ErrorCategory::Input);
        assert!(!response.retryable);
        assert_eq!(response.context.get("line"), Some(&serde_json::json!(3)));
        assert_eq!(response.context.get("token"), Some(&serde_json::json!("abc")));
    }

    #[test]
    fn test_error_response_json() {
        let err = Error::NumericalInstability {
            variable: "weights".into(),
            iteration: 7,
            detail: "ELBO is NaN".into(),
        };
        let json = ErrorResponse::from(&err)
            .with_context("model", "mixture")
            .to_json_pretty();
        assert!(json.contains(r#""category": "inference""#));
        assert!(json.contains(r#""variable": "weights""#));
        assert!(json.contains(r#""model": "mixture""#));
    }

    #[test]
    fn test_format_error_human() {
        let formatted = format_error_human(&parse_error(), false);
        assert!(formatted.contains("Input Parse Error"));
        assert!(formatted.contains("line 3, column 2"));
        assert!(formatted.contains("Fix:"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Config.to_string(), "config");
        assert_eq!(ErrorCategory::Input.to_string(), "input");
    }
}
