//! Closed-form coordinate updates for conjugate-exponential factors.
//!
//! Each rule takes the factor's prior and the current expectations of its
//! Markov blanket and returns the optimal variational factor, or `None`
//! when the result is degenerate.

use mf_math::{Categorical, Dirichlet, Gamma, Gaussian, LOG_SQRT_2PI};

/// Expectations of a component precision `τ` under `q`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionExpectation {
    /// `E[τ]`
    pub mean: f64,
    /// `E[ln τ]`
    pub log: f64,
}

impl PrecisionExpectation {
    /// A known precision `λ`: `E[τ] = λ`, `E[ln τ] = ln λ`.
    pub fn fixed(lambda: f64) -> Self {
        PrecisionExpectation {
            mean: lambda,
            log: lambda.ln(),
        }
    }

    pub fn from_gamma(q: &Gamma) -> Self {
        PrecisionExpectation {
            mean: q.mean(),
            log: q.expected_log(),
        }
    }
}

/// Responsibility-weighted statistics of the points owned by a component.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComponentStats {
    /// `N_j = Σ r_ij`
    pub weight: f64,
    /// `S_j = Σ r_ij x_i`
    pub sum: f64,
}

impl ComponentStats {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, x: f64, responsibility: f64) {
        self.weight += responsibility;
        self.sum += responsibility * x;
    }
}

/// `E[(x − μ)²] = x² − 2x E[μ] + E[μ²]`, written around the mean so it
/// stays non-negative in floating point.
pub fn expected_sq_dev(x: f64, mean: &Gaussian) -> f64 {
    let d = x - mean.mean;
    d * d + mean.variance()
}

/// `E[ln N(x | μ, τ)]` under the factorised posterior.
pub fn expected_log_likelihood(x: f64, mean: &Gaussian, precision: PrecisionExpectation) -> f64 {
    0.5 * precision.log - LOG_SQRT_2PI - 0.5 * precision.mean * expected_sq_dev(x, mean)
}

/// `q(μ_j)`: `τ' = τ0 + E[τ] N_j`, `m' = (τ0 m0 + E[τ] S_j) / τ'`.
pub fn update_mean(
    prior: &Gaussian,
    precision: PrecisionExpectation,
    stats: &ComponentStats,
) -> Option<Gaussian> {
    prior.observe(precision.mean, stats.weight, stats.sum)
}

/// `q(τ_j)`: `a' = a0 + N_j/2`, `b' = b0 + Q_j/2`.
pub fn update_precision(prior: &Gamma, weight: f64, sq_dev: f64) -> Option<Gamma> {
    prior.observe(weight, sq_dev)
}

/// `q(π)`: `α'_j = α0_j + N_j`.
pub fn update_weights(prior: &Dirichlet, counts: &[f64]) -> Option<Dirichlet> {
    prior.observe(counts)
}

/// `q(z_i)` from `ln ρ_ij = E[ln π_j] + E[ln N(x_i | μ_j, τ_j)]`.
///
/// `expected_log_weights` is empty when the model has a single component
/// and no weights.
pub fn update_assignment(
    x: f64,
    expected_log_weights: &[f64],
    components: &[(Gaussian, PrecisionExpectation)],
) -> Option<Categorical> {
    let log_rho: Vec<f64> = components
        .iter()
        .enumerate()
        .map(|(j, (mean, precision))| {
            let prior_term = expected_log_weights.get(j).copied().unwrap_or(0.0);
            prior_term + expected_log_likelihood(x, mean, *precision)
        })
        .collect();
    Categorical::from_log_weights(&log_rho)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_mean_with_no_data_returns_prior() {
        let prior = Gaussian::new(1.5, 0.25).unwrap();
        for precision in [PrecisionExpectation::fixed(3.0), PrecisionExpectation::fixed(0.1)] {
            let post = update_mean(&prior, precision, &ComponentStats::empty()).unwrap();
            assert_eq!(post, prior);
        }
    }

    #[test]
    fn update_precision_with_no_data_returns_prior() {
        let prior = Gamma::new(2.0, 1.0).unwrap();
        assert_eq!(update_precision(&prior, 0.0, 0.0).unwrap(), prior);
    }

    #[test]
    fn update_mean_known_precision() {
        // prior N(0, 1), λ = 1, data {1, 2, 3}: τ' = 4, m' = 6/4
        let prior = Gaussian::new(0.0, 1.0).unwrap();
        let mut stats = ComponentStats::empty();
        for x in [1.0, 2.0, 3.0] {
            stats.accumulate(x, 1.0);
        }
        let post = update_mean(&prior, PrecisionExpectation::fixed(1.0), &stats).unwrap();
        assert!((post.precision - 4.0).abs() < 1e-12);
        assert!((post.mean - 1.5).abs() < 1e-12);
    }

    #[test]
    fn expected_sq_dev_includes_posterior_variance() {
        let q = Gaussian::new(2.0, 4.0).unwrap();
        let direct = 3.0_f64.powi(2) - 2.0 * 3.0 * q.expected_value() + q.expected_square();
        assert!((expected_sq_dev(3.0, &q) - direct).abs() < 1e-12);
    }

    #[test]
    fn expected_log_likelihood_matches_pdf_for_point_mass_limit() {
        let q = Gaussian::new(0.5, 1e12).unwrap();
        let e = expected_log_likelihood(1.0, &q, PrecisionExpectation::fixed(2.0));
        let exact = mf_math::gaussian_log_pdf(1.0, 0.5, 2.0);
        assert!((e - exact).abs() < 1e-9);
    }

    #[test]
    fn assignment_prefers_nearest_component() {
        let near = Gaussian::new(0.0, 100.0).unwrap();
        let far = Gaussian::new(10.0, 100.0).unwrap();
        let tau = PrecisionExpectation::fixed(1.0);
        let q = update_assignment(0.2, &[0.0, 0.0], &[(near, tau), (far, tau)]).unwrap();
        assert_eq!(q.argmax(), 0);
        assert!(q.probs[0] > 0.999);
    }

    #[test]
    fn single_component_assignment_is_certain() {
        let q = update_assignment(
            3.0,
            &[],
            &[(Gaussian::new(0.0, 1.0).unwrap(), PrecisionExpectation::fixed(1.0))],
        )
        .unwrap();
        assert_eq!(q.probs, vec![1.0]);
    }
}
