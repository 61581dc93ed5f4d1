//! Gamma distribution used as the conjugate prior of a Gaussian precision.
//!
//! # Parameterization
//!
//! Uses **rate parameterization**: `Gamma(α, β)` where:
//! - `α` = shape parameter (α > 0)
//! - `β` = rate parameter (β > 0)
//!
//! The density is: `f(t) = β^α / Γ(α) * t^(α-1) * e^(-βt)`

use super::stable::{digamma, log_gamma};
use serde::{Deserialize, Serialize};

/// Log of the Gamma distribution PDF at t.
///
/// # Arguments
/// * `t` - The value at which to evaluate (t >= 0)
/// * `alpha` - Shape parameter (α > 0)
/// * `beta` - Rate parameter (β > 0)
pub fn gamma_log_pdf(t: f64, alpha: f64, beta: f64) -> f64 {
    if t.is_nan() || alpha.is_nan() || beta.is_nan() {
        return f64::NAN;
    }
    if alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    if t < 0.0 {
        return f64::NEG_INFINITY;
    }

    if t == 0.0 {
        if alpha < 1.0 {
            return f64::INFINITY;
        } else if alpha == 1.0 {
            return beta.ln();
        } else {
            return f64::NEG_INFINITY;
        }
    }

    alpha * beta.ln() - log_gamma(alpha) + (alpha - 1.0) * t.ln() - beta * t
}

/// Mean of Gamma(α, β).
///
/// E[T] = α / β
pub fn gamma_mean(alpha: f64, beta: f64) -> f64 {
    if alpha.is_nan() || beta.is_nan() || alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    alpha / beta
}

/// Variance of Gamma(α, β).
///
/// Var[T] = α / β²
pub fn gamma_var(alpha: f64, beta: f64) -> f64 {
    if alpha.is_nan() || beta.is_nan() || alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    alpha / (beta * beta)
}

/// E[ln T] = ψ(α) − ln β
pub fn gamma_expected_log(alpha: f64, beta: f64) -> f64 {
    if alpha.is_nan() || beta.is_nan() || alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    digamma(alpha) - beta.ln()
}

/// Gamma distribution with shape/rate parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gamma {
    pub shape: f64,
    pub rate: f64,
}

impl Gamma {
    /// Create a Gamma with validation.
    ///
    /// Returns None if shape or rate is non-finite or non-positive.
    pub fn new(shape: f64, rate: f64) -> Option<Self> {
        if !shape.is_finite() || !rate.is_finite() || shape <= 0.0 || rate <= 0.0 {
            return None;
        }
        Some(Self { shape, rate })
    }

    /// E[x] = α / β
    pub fn mean(&self) -> f64 {
        gamma_mean(self.shape, self.rate)
    }

    pub fn variance(&self) -> f64 {
        gamma_var(self.shape, self.rate)
    }

    /// E[ln x] = ψ(α) − ln β
    pub fn expected_log(&self) -> f64 {
        gamma_expected_log(self.shape, self.rate)
    }

    pub fn log_pdf(&self, t: f64) -> f64 {
        gamma_log_pdf(t, self.shape, self.rate)
    }

    /// KL(self ‖ other).
    pub fn kl_divergence(&self, other: &Gamma) -> f64 {
        let (aq, bq) = (self.shape, self.rate);
        let (ap, bp) = (other.shape, other.rate);
        (aq - ap) * digamma(aq) - log_gamma(aq) + log_gamma(ap) + ap * (bq.ln() - bp.ln())
            + aq * (bp - bq) / bq
    }

    /// Conjugate update of a Gaussian precision.
    ///
    /// With `N` = effective observation count and `Q` = expected sum of
    /// squared deviations: `α' = α + N/2`, `β' = β + Q/2`.
    pub fn observe(&self, weight: f64, expected_sq_dev: f64) -> Option<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return None;
        }
        if !expected_sq_dev.is_finite() || expected_sq_dev < 0.0 {
            return None;
        }
        Self::new(self.shape + 0.5 * weight, self.rate + 0.5 * expected_sq_dev)
    }
}

impl std::fmt::Display for Gamma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Gamma({:.6}, {:.6})[mean={:.6}]",
            self.shape,
            self.rate,
            self.mean()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        if a.is_infinite() && b.is_infinite() {
            return a.is_sign_positive() == b.is_sign_positive();
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn exponential_pdf_matches_gamma_1_beta() {
        let beta: f64 = 2.5;
        let t: f64 = 1.0;

        // Exponential PDF: f(t) = β * e^(-β*t)
        let expected_log_pdf = beta.ln() - beta * t;
        let gamma_log_pdf_val = gamma_log_pdf(t, 1.0, beta);

        assert!(
            approx_eq(gamma_log_pdf_val, expected_log_pdf, 1e-10),
            "Gamma(1,{}) log_pdf at t={}: got {}, expected {}",
            beta,
            t,
            gamma_log_pdf_val,
            expected_log_pdf
        );
    }

    #[test]
    fn alpha_lt_1_behavior_near_zero() {
        let log_pdf_0 = gamma_log_pdf(0.0, 0.5, 1.0);
        assert!(log_pdf_0.is_infinite() && log_pdf_0.is_sign_positive());
    }

    #[test]
    fn invalid_params_return_nan() {
        assert!(gamma_log_pdf(1.0, -1.0, 1.0).is_nan());
        assert!(gamma_log_pdf(1.0, 0.0, 1.0).is_nan());
        assert!(gamma_log_pdf(1.0, 1.0, -1.0).is_nan());
        assert!(gamma_mean(0.0, 1.0).is_nan());
        assert!(gamma_expected_log(1.0, 0.0).is_nan());
    }

    #[test]
    fn new_rejects_non_positive() {
        assert!(Gamma::new(0.0, 1.0).is_none());
        assert!(Gamma::new(1.0, 0.0).is_none());
        assert!(Gamma::new(-2.0, 1.0).is_none());
        assert!(Gamma::new(f64::INFINITY, 1.0).is_none());
        assert!(Gamma::new(2.0, 1.0).is_some());
    }

    #[test]
    fn mean_and_variance_formulas() {
        let g = Gamma::new(3.0, 2.0).unwrap();
        assert!(approx_eq(g.mean(), 1.5, 1e-12));
        assert!(approx_eq(g.variance(), 0.75, 1e-12));
    }

    #[test]
    fn expected_log_exponential() {
        // Gamma(1, 1): E[ln x] = psi(1) = -0.5772...
        let g = Gamma::new(1.0, 1.0).unwrap();
        assert!(approx_eq(g.expected_log(), -0.577_215_664_901_532_9, 1e-10));
    }

    #[test]
    fn expected_log_below_log_mean() {
        // Jensen: E[ln x] < ln E[x]
        let g = Gamma::new(2.0, 1.0).unwrap();
        assert!(g.expected_log() < g.mean().ln());
    }

    #[test]
    fn kl_self_is_zero() {
        let g = Gamma::new(2.5, 0.7).unwrap();
        assert!(approx_eq(g.kl_divergence(&g), 0.0, 1e-12));
    }

    #[test]
    fn kl_rate_only_change() {
        // Same shape a: KL = a (ln(bq/bp) + bp/bq - 1)
        let q = Gamma::new(2.0, 1.0).unwrap();
        let p = Gamma::new(2.0, 2.0).unwrap();
        let expected = 2.0 * ((1.0f64 / 2.0).ln() + 2.0 - 1.0);
        assert!(approx_eq(q.kl_divergence(&p), expected, 1e-12));
    }

    #[test]
    fn kl_is_non_negative() {
        let q = Gamma::new(50.0, 20.0).unwrap();
        let p = Gamma::new(2.0, 1.0).unwrap();
        assert!(q.kl_divergence(&p) > 0.0);
        assert!(p.kl_divergence(&q) > 0.0);
    }

    #[test]
    fn observe_adds_half_counts() {
        let prior = Gamma::new(2.0, 1.0).unwrap();
        let post = prior.observe(10.0, 4.0).unwrap();
        assert!(approx_eq(post.shape, 7.0, 1e-12));
        assert!(approx_eq(post.rate, 3.0, 1e-12));
    }

    #[test]
    fn observe_rejects_negative_statistics() {
        let prior = Gamma::new(2.0, 1.0).unwrap();
        assert!(prior.observe(-1.0, 1.0).is_none());
        assert!(prior.observe(1.0, -1.0).is_none());
        assert!(prior.observe(1.0, f64::NAN).is_none());
    }
}
