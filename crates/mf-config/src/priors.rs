//! Prior hyperparameter configuration types.
//!
//! One file (`priors.json`) carries the hyperparameters for all three
//! models. Sections a model does not use are ignored by it.

use serde::{Deserialize, Serialize};

/// Complete priors configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priors {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Prior on a Gaussian mean, plus the fixed noise precision used by the
    /// known-precision model.
    #[serde(default)]
    pub mean: MeanPrior,

    /// Gamma prior on a Gaussian precision.
    #[serde(default)]
    pub precision: GammaParams,

    #[serde(default)]
    pub mixture: MixturePrior,
}

/// Gaussian prior on an unknown mean: N(mean, precision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanPrior {
    pub mean: f64,
    pub precision: f64,

    /// Noise precision when it is treated as known.
    #[serde(default = "default_noise_precision")]
    pub noise_precision: f64,

    #[serde(rename = "_comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Gamma distribution parameters: Gamma(shape, rate).
/// Note: uses RATE parameterization (rate = 1/scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaParams {
    pub shape: f64,
    pub rate: f64,

    #[serde(rename = "_comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Mixture structure and Dirichlet prior on the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixturePrior {
    /// Number of components k.
    pub components: usize,

    /// Dirichlet concentration. One value is broadcast to all k components.
    pub concentration: Vec<f64>,
}

fn default_noise_precision() -> f64 {
    1.0
}

impl Default for MeanPrior {
    fn default() -> Self {
        Self {
            mean: 0.0,
            precision: 1.0,
            noise_precision: default_noise_precision(),
            comment: None,
        }
    }
}

impl Default for GammaParams {
    fn default() -> Self {
        Self {
            shape: 2.0,
            rate: 1.0,
            comment: None,
        }
    }
}

impl Default for MixturePrior {
    fn default() -> Self {
        Self {
            components: 3,
            concentration: vec![1.1],
        }
    }
}

impl Default for Priors {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: Some("Built-in default priors".to_string()),
            mean: MeanPrior::default(),
            precision: GammaParams::default(),
            mixture: MixturePrior::default(),
        }
    }
}

impl MixturePrior {
    /// Concentration vector of length `k`, broadcasting a single value.
    ///
    /// Returns None when the configured length is neither 1 nor `k`.
    pub fn concentration_for(&self, k: usize) -> Option<Vec<f64>> {
        match self.concentration.len() {
            1 => Some(vec![self.concentration[0]; k]),
            len if len == k => Some(self.concentration.clone()),
            _ => None,
        }
    }
}

impl Priors {
    /// Load priors from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::validate::ValidationError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Parse priors from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }
}
