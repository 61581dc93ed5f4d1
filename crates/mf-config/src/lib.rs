//! meanfield configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for priors.json and engine.json
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation of hyperparameters and engine settings

pub mod engine;
pub mod priors;
pub mod resolve;
pub mod validate;

pub use engine::EngineSettings;
pub use priors::Priors;
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
