//! Configuration validation errors and semantic validation.

use crate::engine::EngineSettings;
use crate::priors::{GammaParams, Priors};
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

fn check_version(actual: &str) -> ValidationResult<()> {
    if actual != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

fn require_finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be finite, got {}", value),
        });
    }
    Ok(())
}

fn require_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be positive, got {}", value),
        });
    }
    Ok(())
}

/// Validate priors configuration semantically.
pub fn validate_priors(priors: &Priors) -> ValidationResult<()> {
    check_version(&priors.schema_version)?;

    require_finite("mean.mean", priors.mean.mean)?;
    require_positive("mean.precision", priors.mean.precision)?;
    require_positive("mean.noise_precision", priors.mean.noise_precision)?;

    validate_gamma_params("precision", &priors.precision)?;

    let k = priors.mixture.components;
    if k == 0 {
        return Err(ValidationError::InvalidValue {
            field: "mixture.components".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }
    if priors.mixture.concentration_for(k).is_none() {
        return Err(ValidationError::SemanticError(format!(
            "mixture.concentration has {} entries; expected 1 or {}",
            priors.mixture.concentration.len(),
            k
        )));
    }
    for (i, &a) in priors.mixture.concentration.iter().enumerate() {
        require_positive(&format!("mixture.concentration[{}]", i), a)?;
    }

    Ok(())
}

/// Validate Gamma distribution parameters.
fn validate_gamma_params(field: &str, params: &GammaParams) -> ValidationResult<()> {
    require_positive(&format!("{}.shape", field), params.shape)?;
    require_positive(&format!("{}.rate", field), params.rate)?;
    Ok(())
}

/// Validate engine settings semantically.
pub fn validate_engine(settings: &EngineSettings) -> ValidationResult<()> {
    check_version(&settings.schema_version)?;

    if !settings.tolerance.is_finite() || settings.tolerance < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "tolerance".to_string(),
            message: format!("Must be finite and non-negative, got {}", settings.tolerance),
        });
    }
    if settings.max_iterations == 0 {
        return Err(ValidationError::InvalidValue {
            field: "max_iterations".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }
    if settings.restarts == 0 {
        return Err(ValidationError::InvalidValue {
            field: "restarts".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }
    Ok(())
}
