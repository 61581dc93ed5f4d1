//! meanfield shared types.
//!
//! This crate provides the pieces every other crate needs:
//! - The unified error taxonomy with stable codes
//! - Output format selection for the CLI

pub mod error;
pub mod output;

pub use error::{format_error_human, Error, ErrorCategory, ErrorResponse, Result};
pub use output::OutputFormat;
