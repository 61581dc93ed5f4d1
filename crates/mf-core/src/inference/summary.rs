//! Immutable posterior summaries copied out of a finished run.

use super::state::VariationalState;
use crate::model::{Distribution, Family, ModelKind, VariableId};
use mf_common::{Error, Result};
use mf_math::{Gamma, Gaussian};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaussianSummary {
    pub mean: f64,
    pub variance: f64,
    pub precision: f64,
}

impl GaussianSummary {
    /// The same distribution as a prior for a later fit.
    pub fn to_prior(&self) -> Result<Gaussian> {
        Gaussian::new(self.mean, self.precision).ok_or_else(|| {
            Error::Inference(format!(
                "summary N({}, precision {}) is not a valid prior",
                self.mean, self.precision
            ))
        })
    }
}

impl From<&Gaussian> for GaussianSummary {
    fn from(g: &Gaussian) -> Self {
        GaussianSummary {
            mean: g.mean,
            variance: g.variance(),
            precision: g.precision,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GammaSummary {
    pub shape: f64,
    pub rate: f64,
    pub mean: f64,
    pub variance: f64,
}

impl GammaSummary {
    pub fn to_prior(&self) -> Result<Gamma> {
        Gamma::new(self.shape, self.rate).ok_or_else(|| {
            Error::Inference(format!(
                "summary Gamma({}, {}) is not a valid prior",
                self.shape, self.rate
            ))
        })
    }
}

impl From<&Gamma> for GammaSummary {
    fn from(g: &Gamma) -> Self {
        GammaSummary {
            shape: g.shape,
            rate: g.rate,
            mean: g.mean(),
            variance: g.variance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirichletSummary {
    pub concentration: Vec<f64>,
    pub mean: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub probabilities: Vec<f64>,
}

impl CategoricalSummary {
    /// Most probable component (first on ties).
    pub fn argmax(&self) -> usize {
        mf_math::argmax(&self.probabilities)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum PosteriorSummary {
    Gaussian(GaussianSummary),
    Gamma(GammaSummary),
    Dirichlet(DirichletSummary),
    Categorical(CategoricalSummary),
}

impl PosteriorSummary {
    pub fn family(&self) -> Family {
        match self {
            PosteriorSummary::Gaussian(_) => Family::Gaussian,
            PosteriorSummary::Gamma(_) => Family::Gamma,
            PosteriorSummary::Dirichlet(_) => Family::Dirichlet,
            PosteriorSummary::Categorical(_) => Family::Categorical,
        }
    }
}

impl From<&Distribution> for PosteriorSummary {
    fn from(d: &Distribution) -> Self {
        match d {
            Distribution::Gaussian(g) => PosteriorSummary::Gaussian(g.into()),
            Distribution::Gamma(g) => PosteriorSummary::Gamma(g.into()),
            Distribution::Dirichlet(d) => PosteriorSummary::Dirichlet(DirichletSummary {
                concentration: d.alpha.clone(),
                mean: d.mean(),
            }),
            Distribution::Categorical(c) => PosteriorSummary::Categorical(CategoricalSummary {
                probabilities: c.probs.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedPosterior {
    pub id: VariableId,
    pub name: String,
    pub posterior: PosteriorSummary,
}

/// Snapshot of every posterior, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Posteriors {
    entries: Vec<NamedPosterior>,
}

impl Posteriors {
    pub fn from_state(state: &VariationalState) -> Self {
        Posteriors {
            entries: state
                .variables()
                .iter()
                .map(|var| NamedPosterior {
                    id: var.id,
                    name: var.name.clone(),
                    posterior: (&var.posterior).into(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedPosterior> {
        self.entries.iter()
    }

    pub fn get(&self, id: VariableId) -> Result<&NamedPosterior> {
        self.entries
            .get(id.index())
            .filter(|e| e.id == id)
            .or_else(|| self.entries.iter().find(|e| e.id == id))
            .ok_or_else(|| Error::Inference(format!("no posterior for variable {}", id)))
    }

    pub fn by_name(&self, name: &str) -> Option<&NamedPosterior> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn gaussian(&self, id: VariableId) -> Result<GaussianSummary> {
        match &self.get(id)?.posterior {
            PosteriorSummary::Gaussian(s) => Ok(*s),
            other => Err(self.wrong_family(id, Family::Gaussian, other)),
        }
    }

    pub fn gamma(&self, id: VariableId) -> Result<GammaSummary> {
        match &self.get(id)?.posterior {
            PosteriorSummary::Gamma(s) => Ok(*s),
            other => Err(self.wrong_family(id, Family::Gamma, other)),
        }
    }

    pub fn dirichlet(&self, id: VariableId) -> Result<DirichletSummary> {
        match &self.get(id)?.posterior {
            PosteriorSummary::Dirichlet(s) => Ok(s.clone()),
            other => Err(self.wrong_family(id, Family::Dirichlet, other)),
        }
    }

    pub fn categorical(&self, id: VariableId) -> Result<CategoricalSummary> {
        match &self.get(id)?.posterior {
            PosteriorSummary::Categorical(s) => Ok(s.clone()),
            other => Err(self.wrong_family(id, Family::Categorical, other)),
        }
    }

    fn wrong_family(&self, id: VariableId, wanted: Family, found: &PosteriorSummary) -> Error {
        let name = self
            .get(id)
            .map(|e| e.name.as_str())
            .unwrap_or("?");
        Error::Inference(format!(
            "'{}' has a {} posterior; {} requested",
            name,
            found.family(),
            wanted
        ))
    }
}

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceState {
    NotStarted,
    Running,
    Converged,
    MaxIterExceeded,
}

impl std::fmt::Display for InferenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InferenceState::NotStarted => "not_started",
            InferenceState::Running => "running",
            InferenceState::Converged => "converged",
            InferenceState::MaxIterExceeded => "max_iter_exceeded",
        };
        write!(f, "{}", s)
    }
}

/// Posteriors plus run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceReport {
    pub model: ModelKind,
    pub status: InferenceState,
    pub iterations: usize,
    pub elbo: f64,
    pub elbo_trace: Vec<f64>,
    pub elbo_decreases: usize,
    /// Seed of the initialisation that produced these posteriors.
    pub seed: u64,
    pub restarts: usize,
    pub posteriors: Posteriors,
}

impl InferenceReport {
    pub fn converged(&self) -> bool {
        self.status == InferenceState::Converged
    }
}
