//! Frozen model declarations.
//!
//! A [`ModelSpec`] lists every latent variable in update order together
//! with its prior, its parents, the plates it lives on and the observed
//! data. Once built it is only ever borrowed.

use mf_common::{Error, Result};
use mf_math::{Categorical, Dirichlet, Gamma, Gaussian};
use serde::{Deserialize, Serialize};

/// Index of a variable in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableId(pub usize);

impl VariableId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Distribution family of a variable and of its posterior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Gaussian,
    Gamma,
    Dirichlet,
    Categorical,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::Gaussian => write!(f, "gaussian"),
            Family::Gamma => write!(f, "gamma"),
            Family::Dirichlet => write!(f, "dirichlet"),
            Family::Categorical => write!(f, "categorical"),
        }
    }
}

/// A distribution of one of the supported families.
///
/// Used both for priors in the spec and for variational posteriors in the
/// scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Distribution {
    Gaussian(Gaussian),
    Gamma(Gamma),
    Dirichlet(Dirichlet),
    Categorical(Categorical),
}

impl Distribution {
    pub fn family(&self) -> Family {
        match self {
            Distribution::Gaussian(_) => Family::Gaussian,
            Distribution::Gamma(_) => Family::Gamma,
            Distribution::Dirichlet(_) => Family::Dirichlet,
            Distribution::Categorical(_) => Family::Categorical,
        }
    }

    /// All parameters are finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Distribution::Gaussian(g) => g.mean.is_finite() && g.precision.is_finite(),
            Distribution::Gamma(g) => g.shape.is_finite() && g.rate.is_finite(),
            Distribution::Dirichlet(d) => d.alpha.iter().all(|a| a.is_finite()),
            Distribution::Categorical(c) => c.probs.iter().all(|p| p.is_finite()),
        }
    }
}

/// What a variable means inside the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    /// Mean of component `component` (the only component outside mixtures).
    Mean { component: usize },
    /// Precision of component `component`.
    Precision { component: usize },
    /// Mixture weights.
    Weights,
    /// Component assignment of data point `index`.
    Assignment { index: usize },
}

/// Declaration of one latent variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDecl {
    pub id: VariableId,
    pub name: String,
    pub role: Role,
    pub prior: Distribution,
    pub parents: Vec<VariableId>,
}

impl VariableDecl {
    pub fn family(&self) -> Family {
        self.prior.family()
    }
}

/// Named repetition index of fixed size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plate {
    pub name: String,
    pub size: usize,
}

impl Plate {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Plate {
            name: name.into(),
            size,
        }
    }

    /// Check that `actual` items are bound to this plate.
    pub fn bind(&self, actual: usize) -> Result<()> {
        if actual != self.size {
            return Err(Error::PlateMismatch {
                plate: self.name.clone(),
                expected: self.size,
                actual,
            });
        }
        Ok(())
    }
}

/// Immutable observed values bound to the data plate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedData {
    values: Vec<f64>,
}

impl ObservedData {
    /// Wrap observations, rejecting NaN and infinities.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::Config(format!(
                "observation {} is not finite ({})",
                pos, values[pos]
            )));
        }
        Ok(ObservedData { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Noise precision of one component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PrecisionSource {
    /// Known precision.
    Fixed(f64),
    /// Gamma-distributed latent precision.
    Latent(VariableId),
}

/// Which variables generate the points assigned to one component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentBranch {
    pub mean: VariableId,
    pub precision: PrecisionSource,
}

/// The three supported model shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Unknown mean, known noise precision.
    GaussianMean,
    /// Unknown mean and precision.
    GaussianMeanPrecision,
    /// k-component Gaussian mixture.
    Mixture,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::GaussianMean => write!(f, "gaussian-mean"),
            ModelKind::GaussianMeanPrecision => write!(f, "gaussian-mean-precision"),
            ModelKind::Mixture => write!(f, "mixture"),
        }
    }
}

/// Complete, frozen model declaration.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSpec {
    pub(crate) kind: ModelKind,
    pub(crate) variables: Vec<VariableDecl>,
    pub(crate) data_plate: Plate,
    pub(crate) component_plate: Plate,
    pub(crate) components: Vec<ComponentBranch>,
    pub(crate) weights: Option<VariableId>,
    pub(crate) assignments: Vec<VariableId>,
    pub(crate) data: ObservedData,
}

impl ModelSpec {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Latent variables in declaration (= update) order.
    pub fn variables(&self) -> &[VariableDecl] {
        &self.variables
    }

    pub fn variable(&self, id: VariableId) -> Option<&VariableDecl> {
        self.variables.get(id.index())
    }

    pub fn data(&self) -> &ObservedData {
        &self.data
    }

    pub fn data_plate(&self) -> &Plate {
        &self.data_plate
    }

    pub fn component_plate(&self) -> &Plate {
        &self.component_plate
    }

    pub fn components(&self) -> &[ComponentBranch] {
        &self.components
    }

    pub fn weights(&self) -> Option<VariableId> {
        self.weights
    }

    /// Per-point assignment variables; empty outside mixtures.
    pub fn assignments(&self) -> &[VariableId] {
        &self.assignments
    }

    /// Check every plate against what is bound to it and every reference
    /// against the declared variables.
    pub fn validate(&self) -> Result<()> {
        self.data_plate.bind(self.data.len())?;
        self.component_plate.bind(self.components.len())?;
        if !self.assignments.is_empty() {
            self.data_plate.bind(self.assignments.len())?;
        }

        for (pos, decl) in self.variables.iter().enumerate() {
            if decl.id.index() != pos {
                return Err(Error::Inference(format!(
                    "variable '{}' declared at {} but carries id {}",
                    decl.name, pos, decl.id
                )));
            }
        }

        let expect = |id: VariableId, family: Family| -> Result<()> {
            match self.variable(id) {
                Some(decl) if decl.family() == family => Ok(()),
                Some(decl) => Err(Error::Inference(format!(
                    "variable '{}' is {} but is used as {}",
                    decl.name,
                    decl.family(),
                    family
                ))),
                None => Err(Error::Inference(format!("unknown variable {}", id))),
            }
        };

        for branch in &self.components {
            expect(branch.mean, Family::Gaussian)?;
            match branch.precision {
                PrecisionSource::Latent(id) => expect(id, Family::Gamma)?,
                PrecisionSource::Fixed(lambda) => {
                    if !lambda.is_finite() || lambda <= 0.0 {
                        return Err(Error::Config(format!(
                            "fixed precision must be finite and positive, got {}",
                            lambda
                        )));
                    }
                }
            }
        }
        if let Some(id) = self.weights {
            expect(id, Family::Dirichlet)?;
        }
        for &id in &self.assignments {
            expect(id, Family::Categorical)?;
        }
        if self.components.len() > 1 && (self.weights.is_none() || self.assignments.is_empty()) {
            return Err(Error::Config(
                "a model with several components needs weights and assignments".to_string(),
            ));
        }
        Ok(())
    }
}
