//! Evidence lower bound.
//!
//! `ELBO = Σ_i Σ_j r_ij (E[ln π_j] + E[ln N(x_i | μ_j, τ_j)]) + Σ_i H[q(z_i)]
//!        − KL(q(π)‖p(π)) − Σ_j KL(q(μ_j)‖p(μ_j)) − Σ_j KL(q(τ_j)‖p(τ_j))`
//!
//! Terms for variables a model does not declare are zero.

use super::state::VariationalState;
use super::updates::expected_log_likelihood;
use crate::model::{Distribution, ModelSpec, PrecisionSource, VariableId};
use mf_common::{Error, Result};
use serde::Serialize;

/// The ELBO split into its additive parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ElboTerms {
    pub expected_log_likelihood: f64,
    pub expected_log_weights: f64,
    pub assignment_entropy: f64,
    pub kl_weights: f64,
    pub kl_means: f64,
    pub kl_precisions: f64,
}

impl ElboTerms {
    pub fn total(&self) -> f64 {
        self.expected_log_likelihood + self.expected_log_weights + self.assignment_entropy
            - self.kl_weights
            - self.kl_means
            - self.kl_precisions
    }
}

/// Evaluate every ELBO term at the current state.
pub fn evaluate(spec: &ModelSpec, state: &VariationalState) -> Result<ElboTerms> {
    let mut terms = ElboTerms::default();

    let components = spec
        .components()
        .iter()
        .map(|branch| Ok((*state.gaussian(branch.mean)?, state.precision(branch.precision)?)))
        .collect::<Result<Vec<_>>>()?;
    let expected_log_weights = match spec.weights() {
        Some(id) => state.dirichlet(id)?.expected_log(),
        None => vec![0.0; components.len()],
    };

    for (i, &x) in spec.data().values().iter().enumerate() {
        let r = state.responsibilities(spec, i)?;
        for ((rij, (mean, precision)), e_ln_pi) in
            r.iter().zip(components.iter()).zip(expected_log_weights.iter())
        {
            if *rij == 0.0 {
                continue;
            }
            terms.expected_log_likelihood += rij * expected_log_likelihood(x, mean, *precision);
            terms.expected_log_weights += rij * e_ln_pi;
        }
    }
    for &id in spec.assignments() {
        terms.assignment_entropy += state.categorical(id)?.entropy();
    }

    if let Some(id) = spec.weights() {
        let prior = match prior_of(spec, id)? {
            Distribution::Dirichlet(d) => d,
            other => return Err(prior_family_error(id, other)),
        };
        terms.kl_weights = state.dirichlet(id)?.kl_divergence(prior);
    }
    for branch in spec.components() {
        let prior = match prior_of(spec, branch.mean)? {
            Distribution::Gaussian(g) => g,
            other => return Err(prior_family_error(branch.mean, other)),
        };
        terms.kl_means += state.gaussian(branch.mean)?.kl_divergence(prior);

        if let PrecisionSource::Latent(id) = branch.precision {
            let prior = match prior_of(spec, id)? {
                Distribution::Gamma(g) => g,
                other => return Err(prior_family_error(id, other)),
            };
            terms.kl_precisions += state.gamma(id)?.kl_divergence(prior);
        }
    }

    Ok(terms)
}

fn prior_of(spec: &ModelSpec, id: VariableId) -> Result<&Distribution> {
    spec.variable(id)
        .map(|decl| &decl.prior)
        .ok_or_else(|| Error::Inference(format!("unknown variable {}", id)))
}

fn prior_family_error(id: VariableId, prior: &Distribution) -> Error {
    Error::Inference(format!(
        "variable {} has an unexpected {} prior",
        id,
        prior.family()
    ))
}
