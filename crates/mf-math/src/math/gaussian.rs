//! Univariate Gaussian in mean/precision form.
//!
//! # Parameterization
//!
//! `N(m, τ)` where:
//! - `m` = mean
//! - `τ` = precision (τ > 0), i.e. variance `1/τ`
//!
//! The log density is: `½ ln τ − ½ ln 2π − ½ τ (x − m)²`

use super::stable::LOG_SQRT_2PI;
use serde::{Deserialize, Serialize};

/// Log of the Gaussian PDF at x under mean/precision parameterization.
pub fn gaussian_log_pdf(x: f64, mean: f64, precision: f64) -> f64 {
    if x.is_nan() || mean.is_nan() || precision.is_nan() {
        return f64::NAN;
    }
    if precision <= 0.0 || precision.is_infinite() {
        return f64::NAN;
    }
    let d = x - mean;
    0.5 * precision.ln() - LOG_SQRT_2PI - 0.5 * precision * d * d
}

/// Gaussian distribution over a real scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    pub mean: f64,
    pub precision: f64,
}

impl Gaussian {
    /// Create a Gaussian with validation.
    ///
    /// Returns None for a non-finite mean or a precision that is not a
    /// finite positive number. Infinite precision (a zero-variance point
    /// mass) is rejected.
    pub fn new(mean: f64, precision: f64) -> Option<Self> {
        if !mean.is_finite() || !precision.is_finite() || precision <= 0.0 {
            return None;
        }
        Some(Self { mean, precision })
    }

    /// Create from mean and variance.
    pub fn from_mean_and_variance(mean: f64, variance: f64) -> Option<Self> {
        if !variance.is_finite() || variance <= 0.0 {
            return None;
        }
        Self::new(mean, 1.0 / variance)
    }

    pub fn variance(&self) -> f64 {
        1.0 / self.precision
    }

    /// E[x]
    pub fn expected_value(&self) -> f64 {
        self.mean
    }

    /// E[x²] = m² + 1/τ
    pub fn expected_square(&self) -> f64 {
        self.mean * self.mean + self.variance()
    }

    /// Differential entropy: ½(1 + ln 2π − ln τ).
    pub fn entropy(&self) -> f64 {
        0.5 + LOG_SQRT_2PI - 0.5 * self.precision.ln()
    }

    pub fn log_pdf(&self, x: f64) -> f64 {
        gaussian_log_pdf(x, self.mean, self.precision)
    }

    /// KL(self ‖ other).
    pub fn kl_divergence(&self, other: &Gaussian) -> f64 {
        let d = self.mean - other.mean;
        0.5 * ((self.precision / other.precision).ln() + other.precision / self.precision
            + other.precision * d * d
            - 1.0)
    }

    /// Conjugate update of a Gaussian mean given weighted observations.
    ///
    /// With prior `N(m0, τ0)`, noise precision expectation `E[λ]`,
    /// observation weight sum `N` and weighted sum `S`:
    /// `τ' = τ0 + E[λ]·N`, `m' = (τ0·m0 + E[λ]·S) / τ'`.
    ///
    /// Returns None if the result is degenerate or non-finite.
    pub fn observe(&self, noise_precision: f64, weight: f64, weighted_sum: f64) -> Option<Self> {
        if !noise_precision.is_finite() || noise_precision <= 0.0 {
            return None;
        }
        if !weight.is_finite() || weight < 0.0 || !weighted_sum.is_finite() {
            return None;
        }
        let precision = self.precision + noise_precision * weight;
        let mean = (self.precision * self.mean + noise_precision * weighted_sum) / precision;
        Self::new(mean, precision)
    }
}

impl std::fmt::Display for Gaussian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Gaussian({:.6}, {:.6})", self.mean, self.variance())
    }
}
