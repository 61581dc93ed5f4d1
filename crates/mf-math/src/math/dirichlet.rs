//! Dirichlet distribution over mixture weights.
//!
//! The model uses:
//! - Prior: `π = (π_1..π_K) ~ Dirichlet(α_1..α_K)`
//! - Assignments: `z_i | π ~ Categorical(π)`
//! - Posterior given soft counts `N_k = Σ_i r_ik`: `Dirichlet(α_k + N_k)`

use super::stable::{digamma, log_gamma, log_multivariate_beta};
use serde::{Deserialize, Serialize};

/// Dirichlet distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dirichlet {
    /// Concentration parameters (all must be > 0)
    pub alpha: Vec<f64>,
}

impl Dirichlet {
    /// Create new Dirichlet parameters with validation.
    ///
    /// Returns None if any parameter is non-positive, non-finite, or if the
    /// vector is empty.
    pub fn new(alpha: Vec<f64>) -> Option<Self> {
        if alpha.is_empty() {
            return None;
        }
        for &a in &alpha {
            if !a.is_finite() || a <= 0.0 {
                return None;
            }
        }
        Some(Self { alpha })
    }

    /// Create a symmetric Dirichlet with all α_i = value.
    pub fn symmetric(k: usize, value: f64) -> Option<Self> {
        if k == 0 {
            return None;
        }
        Self::new(vec![value; k])
    }

    /// Number of categories K.
    pub fn k(&self) -> usize {
        self.alpha.len()
    }

    /// Sum of all concentration parameters: α_0 = Σ_i α_i.
    pub fn concentration(&self) -> f64 {
        self.alpha.iter().sum()
    }

    /// Mean of the Dirichlet distribution: E[π_i] = α_i / α_0.
    pub fn mean(&self) -> Vec<f64> {
        let sum = self.concentration();
        self.alpha.iter().map(|a| a / sum).collect()
    }

    /// Variance of component i: Var[π_i] = α_i(α_0 - α_i) / (α_0²(α_0+1)).
    pub fn variance(&self, i: usize) -> f64 {
        if i >= self.alpha.len() {
            return f64::NAN;
        }
        let sum = self.concentration();
        let a_i = self.alpha[i];
        (a_i * (sum - a_i)) / (sum * sum * (sum + 1.0))
    }

    /// E[ln π_k] = ψ(α_k) − ψ(α_0) for every k.
    pub fn expected_log(&self) -> Vec<f64> {
        let psi_total = digamma(self.concentration());
        self.alpha.iter().map(|&a| digamma(a) - psi_total).collect()
    }

    /// KL(self ‖ other). NaN when the dimensions differ.
    pub fn kl_divergence(&self, other: &Dirichlet) -> f64 {
        if self.k() != other.k() {
            return f64::NAN;
        }
        let total_q = self.concentration();
        let total_p = other.concentration();
        let psi_total_q = digamma(total_q);

        let mut kl = log_gamma(total_q) - log_gamma(total_p);
        for (&aq, &ap) in self.alpha.iter().zip(other.alpha.iter()) {
            kl += log_gamma(ap) - log_gamma(aq) + (aq - ap) * (digamma(aq) - psi_total_q);
        }
        kl
    }

    /// Log normalizer log B(α).
    pub fn log_normalizer(&self) -> f64 {
        log_multivariate_beta(&self.alpha)
    }

    /// Posterior after soft category counts: α_k + N_k.
    ///
    /// Returns None on length mismatch or negative/non-finite counts.
    pub fn observe(&self, counts: &[f64]) -> Option<Self> {
        if counts.len() != self.k() {
            return None;
        }
        if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return None;
        }
        Self::new(
            self.alpha
                .iter()
                .zip(counts.iter())
                .map(|(&a, &n)| a + n)
                .collect(),
        )
    }
}

impl std::fmt::Display for Dirichlet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.alpha.iter().map(|a| format!("{:.4}", a)).collect();
        write!(f, "Dirichlet({})", parts.join(" "))
    }
}
