//! Categorical distribution over `K` outcomes.

use super::stable::{argmax, normalize_log_weights, xlogx};
use serde::{Deserialize, Serialize};

/// Probabilities must sum to one within this slack.
const NORMALIZATION_TOL: f64 = 1e-9;

/// Categorical distribution with explicit probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorical {
    pub probs: Vec<f64>,
}

impl Categorical {
    /// Create a Categorical with validation.
    ///
    /// Returns None if the vector is empty, any entry is negative or
    /// non-finite, or the entries do not sum to one.
    pub fn new(probs: Vec<f64>) -> Option<Self> {
        if probs.is_empty() {
            return None;
        }
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return None;
        }
        let total: f64 = probs.iter().sum();
        if (total - 1.0).abs() > NORMALIZATION_TOL {
            return None;
        }
        Some(Self { probs })
    }

    /// Uniform over `k` outcomes.
    pub fn uniform(k: usize) -> Option<Self> {
        if k == 0 {
            return None;
        }
        Some(Self {
            probs: vec![1.0 / k as f64; k],
        })
    }

    /// All mass on `index`.
    pub fn point_mass(k: usize, index: usize) -> Option<Self> {
        if index >= k {
            return None;
        }
        let mut probs = vec![0.0; k];
        probs[index] = 1.0;
        Some(Self { probs })
    }

    /// Softmax of unnormalized log-weights.
    pub fn from_log_weights(log_weights: &[f64]) -> Option<Self> {
        normalize_log_weights(log_weights).map(|probs| Self { probs })
    }

    pub fn k(&self) -> usize {
        self.probs.len()
    }

    /// Shannon entropy in nats.
    pub fn entropy(&self) -> f64 {
        -self.probs.iter().map(|&p| xlogx(p)).sum::<f64>()
    }

    /// KL(self ‖ other).
    ///
    /// Infinite when self puts mass where other has none. NaN when the
    /// dimensions differ.
    pub fn kl_divergence(&self, other: &Categorical) -> f64 {
        if self.k() != other.k() {
            return f64::NAN;
        }
        let mut kl = 0.0;
        for (&q, &p) in self.probs.iter().zip(other.probs.iter()) {
            if q == 0.0 {
                continue;
            }
            if p == 0.0 {
                return f64::INFINITY;
            }
            kl += q * (q / p).ln();
        }
        kl
    }

    /// Index of the most probable outcome (first on ties).
    pub fn argmax(&self) -> usize {
        argmax(&self.probs)
    }
}

impl std::fmt::Display for Categorical {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.probs.iter().map(|p| format!("{:.4}", p)).collect();
        write!(f, "Categorical({})", parts.join(" "))
    }
}
