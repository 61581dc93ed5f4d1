//! Configuration loading for mf-core.
//!
//! This module handles:
//! - Loading priors.json and engine.json files
//! - Config resolution order (CLI > env > XDG > defaults)
//! - Semantic validation of both files

pub use mf_config::engine::EngineSettings;
pub use mf_config::priors::{self, Priors};
pub use mf_config::resolve::ConfigSource;
pub use mf_config::validate::ValidationError;

use mf_config::resolve::resolve_config;
use mf_config::validate::{validate_engine, validate_priors};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for mf_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::IoError { source, .. } => mf_common::Error::Io(source),
            other => mf_common::Error::Config(other.to_string()),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub priors: Priors,
    /// Path to the priors file (None if using defaults).
    pub priors_path: Option<PathBuf>,
    pub priors_source: ConfigSource,

    pub engine: EngineSettings,
    /// Path to the engine file (None if using defaults).
    pub engine_path: Option<PathBuf>,
    pub engine_source: ConfigSource,
}

impl ResolvedConfig {
    /// Built-in defaults with no files consulted.
    pub fn builtin() -> Self {
        ResolvedConfig {
            priors: Priors::default(),
            priors_path: None,
            priors_source: ConfigSource::BuiltinDefault,
            engine: EngineSettings::default(),
            engine_path: None,
            engine_source: ConfigSource::BuiltinDefault,
        }
    }

    /// Serializable view for `config show`.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            priors_path: self.priors_path.clone(),
            priors_source: self.priors_source.to_string(),
            engine_path: self.engine_path.clone(),
            engine_source: self.engine_source.to_string(),
            priors: self.priors.clone(),
            engine: self.engine.clone(),
        }
    }
}

/// Effective configuration plus where each part came from.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub priors_path: Option<PathBuf>,
    pub priors_source: String,
    pub engine_path: Option<PathBuf>,
    pub engine_source: String,
    pub priors: Priors,
    pub engine: EngineSettings,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config directory (highest priority).
    pub config_dir: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit config directory (via ConfigOptions)
/// 2. MEANFIELD_CONFIG_DIR
/// 3. XDG config home (~/.config/meanfield/)
/// 4. Built-in defaults
///
/// An explicit directory that does not exist is an error; a directory
/// without one of the files falls through for that file only.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    if let Some(dir) = &options.config_dir {
        if !dir.is_dir() {
            return Err(ConfigError::NotFound { path: dir.clone() });
        }
    }

    let paths = resolve_config(options.config_dir.as_deref());

    let priors = match &paths.priors {
        Some(path) => read_json::<Priors>(path)?,
        None => Priors::default(),
    };
    let engine = match &paths.engine {
        Some(path) => read_json::<EngineSettings>(path)?,
        None => EngineSettings::default(),
    };

    validate_priors(&priors)?;
    validate_engine(&engine)?;

    Ok(ResolvedConfig {
        priors,
        priors_path: paths.priors,
        priors_source: paths.priors_source,
        engine,
        engine_path: paths.engine,
        engine_source: paths.engine_source,
    })
}

/// Validate a single config file, guessing its kind from the file name.
pub fn validate_file(path: &Path) -> Result<&'static str, ConfigError> {
    let is_engine = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("engine"));
    if is_engine {
        validate_engine(&read_json::<EngineSettings>(path)?)?;
        Ok("engine")
    } else {
        validate_priors(&read_json::<Priors>(path)?)?;
        Ok("priors")
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::IoError {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}
