//! Inference engine settings (`engine.json`).

use serde::{Deserialize, Serialize};

/// Convergence and reproducibility knobs for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub schema_version: String,

    /// Relative ELBO change below which a run counts as converged.
    pub tolerance: f64,

    /// Sweep cap.
    pub max_iterations: usize,

    /// Seed for symmetry-breaking initialization of mixture assignments.
    pub seed: u64,

    /// Independently seeded mixture runs; the best ELBO wins.
    pub restarts: usize,

    /// How many leading data points get their assignment posterior printed.
    pub diagnostic_points: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            tolerance: 1e-6,
            max_iterations: 1000,
            seed: 0,
            restarts: 1,
            diagnostic_points: 5,
        }
    }
}

impl EngineSettings {
    /// Load engine settings from a JSON file.
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

    /// Parse engine settings from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }
}
