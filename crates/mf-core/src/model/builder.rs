//! Builders for the three supported models.
//!
//! Each builder validates hyperparameters and data, declares the latent
//! variables in update order (component means, component precisions,
//! mixture weights, assignments) and returns the frozen [`ModelSpec`]
//! together with handles to the variables callers usually want to read.

use super::spec::{
    ComponentBranch, Distribution, ModelKind, ModelSpec, ObservedData, Plate, PrecisionSource,
    Role, VariableDecl, VariableId,
};
use mf_common::{Error, Result};
use mf_math::{Categorical, Dirichlet, Gamma, Gaussian};

/// Variables of the known-precision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaussianMeanHandles {
    pub mean: VariableId,
}

/// Variables of the unknown mean and precision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeanPrecisionHandles {
    pub mean: VariableId,
    pub precision: VariableId,
}

/// Variables of the mixture model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixtureHandles {
    pub means: Vec<VariableId>,
    pub precisions: Vec<VariableId>,
    pub weights: VariableId,
    pub assignments: Vec<VariableId>,
}

/// Unknown mean, known noise precision `fixed_precision`.
pub fn build_gaussian_mean_model(
    prior_mean: f64,
    prior_precision: f64,
    fixed_precision: f64,
    data: &[f64],
) -> Result<(ModelSpec, GaussianMeanHandles)> {
    let observed = observed(data)?;
    let mean_prior = gaussian_prior(prior_mean, prior_precision)?;
    if !fixed_precision.is_finite() || fixed_precision <= 0.0 {
        return Err(Error::Config(format!(
            "noise precision must be finite and positive, got {}",
            fixed_precision
        )));
    }

    let mut decls = Declarations::default();
    let mean = decls.push("mean", Role::Mean { component: 0 }, mean_prior, vec![]);

    let spec = ModelSpec {
        kind: ModelKind::GaussianMean,
        variables: decls.finish(),
        data_plate: Plate::new("data", observed.len()),
        component_plate: Plate::new("components", 1),
        components: vec![ComponentBranch {
            mean,
            precision: PrecisionSource::Fixed(fixed_precision),
        }],
        weights: None,
        assignments: Vec::new(),
        data: observed,
    };
    spec.validate()?;
    Ok((spec, GaussianMeanHandles { mean }))
}

/// Unknown mean and precision with a factorised `q(mean) q(precision)`.
pub fn build_gaussian_mean_precision_model(
    prior_mean: f64,
    prior_mean_precision: f64,
    gamma_shape: f64,
    gamma_rate: f64,
    data: &[f64],
) -> Result<(ModelSpec, MeanPrecisionHandles)> {
    let observed = observed(data)?;
    let mean_prior = gaussian_prior(prior_mean, prior_mean_precision)?;
    let precision_prior = gamma_prior(gamma_shape, gamma_rate)?;

    let mut decls = Declarations::default();
    let mean = decls.push("mean", Role::Mean { component: 0 }, mean_prior, vec![]);
    let precision = decls.push(
        "precision",
        Role::Precision { component: 0 },
        precision_prior,
        vec![],
    );

    let spec = ModelSpec {
        kind: ModelKind::GaussianMeanPrecision,
        variables: decls.finish(),
        data_plate: Plate::new("data", observed.len()),
        component_plate: Plate::new("components", 1),
        components: vec![ComponentBranch {
            mean,
            precision: PrecisionSource::Latent(precision),
        }],
        weights: None,
        assignments: Vec::new(),
        data: observed,
    };
    spec.validate()?;
    Ok((spec, MeanPrecisionHandles { mean, precision }))
}

/// `k`-component Gaussian mixture.
///
/// Every component shares the same mean and precision priors. The
/// concentration vector has length 1 (broadcast to a symmetric Dirichlet)
/// or `k`.
pub fn build_mixture_model(
    k: usize,
    prior_mean: f64,
    prior_precision: f64,
    gamma_shape: f64,
    gamma_rate: f64,
    dirichlet_concentration: &[f64],
    data: &[f64],
) -> Result<(ModelSpec, MixtureHandles)> {
    if k < 1 {
        return Err(Error::Config(
            "mixture needs at least one component".to_string(),
        ));
    }
    let observed = observed(data)?;
    let mean_prior = gaussian_prior(prior_mean, prior_precision)?;
    let precision_prior = gamma_prior(gamma_shape, gamma_rate)?;
    let weights_prior = dirichlet_prior(k, dirichlet_concentration)?;
    let assignment_prior = Categorical::uniform(k)
        .ok_or_else(|| Error::Config(format!("cannot build a uniform categorical over {k}")))?;

    let mut decls = Declarations::default();
    let means: Vec<VariableId> = (0..k)
        .map(|j| {
            decls.push(
                format!("mean[{j}]"),
                Role::Mean { component: j },
                Distribution::Gaussian(mean_prior),
                vec![],
            )
        })
        .collect();
    let precisions: Vec<VariableId> = (0..k)
        .map(|j| {
            decls.push(
                format!("precision[{j}]"),
                Role::Precision { component: j },
                Distribution::Gamma(precision_prior),
                vec![],
            )
        })
        .collect();
    let weights = decls.push(
        "weights",
        Role::Weights,
        Distribution::Dirichlet(weights_prior),
        vec![],
    );

    let mut assignment_parents = vec![weights];
    assignment_parents.extend(means.iter().copied());
    assignment_parents.extend(precisions.iter().copied());
    let assignments: Vec<VariableId> = (0..observed.len())
        .map(|i| {
            decls.push(
                format!("z[{i}]"),
                Role::Assignment { index: i },
                Distribution::Categorical(assignment_prior.clone()),
                assignment_parents.clone(),
            )
        })
        .collect();

    let components = means
        .iter()
        .zip(precisions.iter())
        .map(|(&mean, &precision)| ComponentBranch {
            mean,
            precision: PrecisionSource::Latent(precision),
        })
        .collect();

    let spec = ModelSpec {
        kind: ModelKind::Mixture,
        variables: decls.finish(),
        data_plate: Plate::new("data", observed.len()),
        component_plate: Plate::new("components", k),
        components,
        weights: Some(weights),
        assignments: assignments.clone(),
        data: observed,
    };
    spec.validate()?;
    Ok((
        spec,
        MixtureHandles {
            means,
            precisions,
            weights,
            assignments,
        },
    ))
}

#[derive(Default)]
struct Declarations {
    decls: Vec<VariableDecl>,
}

impl Declarations {
    fn push(
        &mut self,
        name: impl Into<String>,
        role: Role,
        prior: impl Into<Distribution>,
        parents: Vec<VariableId>,
    ) -> VariableId {
        let id = VariableId(self.decls.len());
        self.decls.push(VariableDecl {
            id,
            name: name.into(),
            role,
            prior: prior.into(),
            parents,
        });
        id
    }

    fn finish(self) -> Vec<VariableDecl> {
        self.decls
    }
}

impl From<Gaussian> for Distribution {
    fn from(g: Gaussian) -> Self {
        Distribution::Gaussian(g)
    }
}

impl From<Gamma> for Distribution {
    fn from(g: Gamma) -> Self {
        Distribution::Gamma(g)
    }
}

fn observed(data: &[f64]) -> Result<ObservedData> {
    if data.is_empty() {
        return Err(Error::Config("no observations to fit".to_string()));
    }
    ObservedData::new(data.to_vec())
}

fn gaussian_prior(mean: f64, precision: f64) -> Result<Gaussian> {
    Gaussian::new(mean, precision).ok_or_else(|| {
        Error::Config(format!(
            "invalid Gaussian prior: mean {} precision {}",
            mean, precision
        ))
    })
}

fn gamma_prior(shape: f64, rate: f64) -> Result<Gamma> {
    Gamma::new(shape, rate).ok_or_else(|| {
        Error::Config(format!(
            "invalid Gamma prior: shape {} rate {}",
            shape, rate
        ))
    })
}

fn dirichlet_prior(k: usize, concentration: &[f64]) -> Result<Dirichlet> {
    let alpha = match concentration.len() {
        1 => vec![concentration[0]; k],
        n if n == k => concentration.to_vec(),
        n => {
            return Err(Error::Config(format!(
                "concentration has {} entries; expected 1 or {}",
                n, k
            )))
        }
    };
    Dirichlet::new(alpha)
        .ok_or_else(|| Error::Config(format!("invalid Dirichlet concentration {:?}", concentration)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::spec::Family;

    #[test]
    fn mean_model_declares_one_variable() {
        let (spec, handles) = build_gaussian_mean_model(0.0, 1.0, 1.0, &[1.0, 2.0]).unwrap();
        assert_eq!(spec.kind(), ModelKind::GaussianMean);
        assert_eq!(spec.variables().len(), 1);
        assert_eq!(handles.mean, VariableId(0));
        assert_eq!(spec.data_plate().size, 2);
        assert_eq!(spec.components()[0].precision, PrecisionSource::Fixed(1.0));
    }

    #[test]
    fn mean_precision_declares_mean_then_precision() {
        let (spec, h) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &[1.0]).unwrap();
        assert_eq!(spec.variable(h.mean).unwrap().family(), Family::Gaussian);
        assert_eq!(spec.variable(h.precision).unwrap().family(), Family::Gamma);
        assert!(h.mean < h.precision);
    }

    #[test]
    fn mixture_declaration_order() {
        let data = [1.0, 2.0, 3.0, 4.0];
        let (spec, h) = build_mixture_model(3, 0.0, 1.0, 2.0, 1.0, &[1.1], &data).unwrap();
        assert_eq!(spec.variables().len(), 3 + 3 + 1 + 4);
        assert_eq!(h.means, vec![VariableId(0), VariableId(1), VariableId(2)]);
        assert_eq!(h.precisions[0], VariableId(3));
        assert_eq!(h.weights, VariableId(6));
        assert_eq!(h.assignments.len(), 4);
        assert_eq!(spec.component_plate().size, 3);
        match &spec.variable(h.weights).unwrap().prior {
            Distribution::Dirichlet(d) => assert_eq!(d.alpha, vec![1.1; 3]),
            other => panic!("unexpected prior {other:?}"),
        }
        assert_eq!(spec.variable(h.assignments[0]).unwrap().parents.len(), 7);
    }

    #[test]
    fn empty_data_rejected() {
        assert!(matches!(
            build_gaussian_mean_model(0.0, 1.0, 1.0, &[]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            build_mixture_model(2, 0.0, 1.0, 2.0, 1.0, &[1.0], &[]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn zero_components_rejected() {
        assert!(matches!(
            build_mixture_model(0, 0.0, 1.0, 2.0, 1.0, &[1.0], &[1.0]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn concentration_length_checked() {
        let err = build_mixture_model(3, 0.0, 1.0, 2.0, 1.0, &[1.0, 1.0], &[1.0]).unwrap_err();
        assert!(err.to_string().contains("expected 1 or 3"));
        assert!(build_mixture_model(2, 0.0, 1.0, 2.0, 1.0, &[1.0, 2.0], &[1.0]).is_ok());
    }

    #[test]
    fn invalid_hyperparameters_rejected() {
        assert!(build_gaussian_mean_model(0.0, 0.0, 1.0, &[1.0]).is_err());
        assert!(build_gaussian_mean_model(f64::NAN, 1.0, 1.0, &[1.0]).is_err());
        assert!(build_gaussian_mean_model(0.0, 1.0, -1.0, &[1.0]).is_err());
        assert!(build_gaussian_mean_precision_model(0.0, 1.0, 0.0, 1.0, &[1.0]).is_err());
        assert!(build_mixture_model(2, 0.0, 1.0, 2.0, 1.0, &[0.0], &[1.0]).is_err());
    }

    #[test]
    fn non_finite_data_rejected() {
        assert!(build_gaussian_mean_model(0.0, 1.0, 1.0, &[1.0, f64::INFINITY]).is_err());
    }
}
