//! Exit codes for the mf-core CLI.
//!
//! Exit codes communicate the run outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0-1: Inference outcomes (parse outcome from code, not output)
//! - 10-19: User/input errors (recoverable by fixing input or config)
//! - 20-29: Runtime errors

use crate::inference::InferenceState;
use mf_common::Error;

/// Exit codes for mf-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Inference Outcomes (0-1)
    // ========================================================================
    /// ELBO converged (or command finished cleanly)
    Converged = 0,

    /// Iteration cap reached before convergence; posteriors still reported
    MaxIterations = 1,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Invalid configuration, hyperparameters or plate sizes
    ConfigError = 11,

    /// Malformed data file
    ParseError = 12,

    // ========================================================================
    // Runtime Errors (20-29)
    // ========================================================================
    /// A posterior or the ELBO became NaN/Inf
    NumericalError = 20,

    /// I/O error
    IoError = 21,

    /// Internal error (bug - please report)
    InternalError = 22,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether posteriors were produced (codes 0-1).
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// User/input error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Converged => "OK_CONVERGED",
            ExitCode::MaxIterations => "OK_MAX_ITERATIONS",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::ParseError => "ERR_PARSE",
            ExitCode::NumericalError => "ERR_NUMERICAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }

    /// Map an engine error onto its process exit code.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::PlateMismatch { .. } => ExitCode::ConfigError,
            Error::Parse { .. } => ExitCode::ParseError,
            Error::NumericalInstability { .. } => ExitCode::NumericalError,
            Error::Io(_) => ExitCode::IoError,
            Error::Json(_) | Error::Inference(_) => ExitCode::InternalError,
        }
    }
}

impl From<InferenceState> for ExitCode {
    fn from(state: InferenceState) -> Self {
        match state {
            InferenceState::Converged => ExitCode::Converged,
            InferenceState::MaxIterExceeded => ExitCode::MaxIterations,
            // a finished run never reports these
            InferenceState::NotStarted | InferenceState::Running => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
