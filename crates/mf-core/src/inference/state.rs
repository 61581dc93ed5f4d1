//! Mutable variational state owned by the scheduler.

use super::updates::{ComponentStats, PrecisionExpectation};
use crate::model::{Distribution, Family, ModelSpec, PrecisionSource, VariableId};
use mf_common::{Error, Result};
use mf_math::{Categorical, Dirichlet, Gamma, Gaussian};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A latent variable together with its current variational posterior.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomVariable {
    pub id: VariableId,
    pub name: String,
    pub family: Family,
    /// Always of `family`.
    pub posterior: Distribution,
    pub parents: Vec<VariableId>,
}

/// One posterior per declared variable, indexed by [`VariableId`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariationalState {
    variables: Vec<RandomVariable>,
}

impl VariationalState {
    /// Every posterior starts at its prior; mixture assignments start as
    /// point masses on components drawn uniformly with `seed`.
    pub fn initialize(spec: &ModelSpec, seed: u64) -> Result<Self> {
        let mut variables: Vec<RandomVariable> = spec
            .variables()
            .iter()
            .map(|decl| RandomVariable {
                id: decl.id,
                name: decl.name.clone(),
                family: decl.family(),
                posterior: decl.prior.clone(),
                parents: decl.parents.clone(),
            })
            .collect();

        let k = spec.components().len();
        let mut rng = StdRng::seed_from_u64(seed);
        for &id in spec.assignments() {
            let index = rng.random_range(0..k);
            let start = Categorical::point_mass(k, index).ok_or_else(|| {
                Error::Inference(format!("cannot place point mass on {} of {}", index, k))
            })?;
            let var = variables
                .get_mut(id.index())
                .ok_or_else(|| Error::Inference(format!("unknown variable {}", id)))?;
            var.posterior = Distribution::Categorical(start);
        }

        Ok(VariationalState { variables })
    }

    pub fn variables(&self) -> &[RandomVariable] {
        &self.variables
    }

    pub fn get(&self, id: VariableId) -> Result<&RandomVariable> {
        self.variables
            .get(id.index())
            .ok_or_else(|| Error::Inference(format!("unknown variable {}", id)))
    }

    /// Replace a posterior, keeping the family fixed.
    pub fn set(&mut self, id: VariableId, posterior: Distribution) -> Result<()> {
        let var = self
            .variables
            .get_mut(id.index())
            .ok_or_else(|| Error::Inference(format!("unknown variable {}", id)))?;
        if var.family != posterior.family() {
            return Err(Error::Inference(format!(
                "cannot store a {} posterior in {} variable '{}'",
                posterior.family(),
                var.family,
                var.name
            )));
        }
        var.posterior = posterior;
        Ok(())
    }

    pub fn gaussian(&self, id: VariableId) -> Result<&Gaussian> {
        match &self.get(id)?.posterior {
            Distribution::Gaussian(g) => Ok(g),
            other => Err(family_error(id, Family::Gaussian, other.family())),
        }
    }

    pub fn gamma(&self, id: VariableId) -> Result<&Gamma> {
        match &self.get(id)?.posterior {
            Distribution::Gamma(g) => Ok(g),
            other => Err(family_error(id, Family::Gamma, other.family())),
        }
    }

    pub fn dirichlet(&self, id: VariableId) -> Result<&Dirichlet> {
        match &self.get(id)?.posterior {
            Distribution::Dirichlet(d) => Ok(d),
            other => Err(family_error(id, Family::Dirichlet, other.family())),
        }
    }

    pub fn categorical(&self, id: VariableId) -> Result<&Categorical> {
        match &self.get(id)?.posterior {
            Distribution::Categorical(c) => Ok(c),
            other => Err(family_error(id, Family::Categorical, other.family())),
        }
    }

    /// Current `E[τ]` and `E[ln τ]` of a component precision.
    pub fn precision(&self, source: PrecisionSource) -> Result<PrecisionExpectation> {
        match source {
            PrecisionSource::Fixed(lambda) => Ok(PrecisionExpectation::fixed(lambda)),
            PrecisionSource::Latent(id) => Ok(PrecisionExpectation::from_gamma(self.gamma(id)?)),
        }
    }

    /// Responsibilities of every component for point `i`.
    ///
    /// Without assignment variables the single component owns every point.
    pub fn responsibilities(&self, spec: &ModelSpec, i: usize) -> Result<Vec<f64>> {
        match spec.assignments().get(i) {
            Some(&id) => Ok(self.categorical(id)?.probs.clone()),
            None if spec.assignments().is_empty() => Ok(vec![1.0; spec.components().len()]),
            None => Err(Error::Inference(format!("no assignment for point {}", i))),
        }
    }

    /// `N_j` and `S_j` for every component under the current assignments.
    pub fn component_stats(&self, spec: &ModelSpec) -> Result<Vec<ComponentStats>> {
        let mut stats = vec![ComponentStats::empty(); spec.components().len()];
        for (i, &x) in spec.data().values().iter().enumerate() {
            let r = self.responsibilities(spec, i)?;
            for (s, &rij) in stats.iter_mut().zip(r.iter()) {
                s.accumulate(x, rij);
            }
        }
        Ok(stats)
    }
}

fn family_error(id: VariableId, expected: Family, actual: Family) -> Error {
    Error::Inference(format!(
        "variable {} holds a {} posterior, not {}",
        id, actual, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{build_gaussian_mean_precision_model, build_mixture_model};

    #[test]
    fn initial_posteriors_equal_priors() {
        let (spec, h) = build_gaussian_mean_precision_model(1.0, 2.0, 3.0, 4.0, &[0.5]).unwrap();
        let state = VariationalState::initialize(&spec, 0).unwrap();
        assert_eq!(*state.gaussian(h.mean).unwrap(), Gaussian::new(1.0, 2.0).unwrap());
        assert_eq!(*state.gamma(h.precision).unwrap(), Gamma::new(3.0, 4.0).unwrap());
    }

    #[test]
    fn assignments_start_as_seeded_point_masses() {
        let data: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let (spec, h) = build_mixture_model(3, 0.0, 1.0, 2.0, 1.0, &[1.0], &data).unwrap();
        let a = VariationalState::initialize(&spec, 7).unwrap();
        let b = VariationalState::initialize(&spec, 7).unwrap();
        assert_eq!(a, b);
        for &id in &h.assignments {
            let q = a.categorical(id).unwrap();
            assert_eq!(q.probs.iter().filter(|&&p| p == 1.0).count(), 1);
        }
        let c = VariationalState::initialize(&spec, 8).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn set_refuses_family_change() {
        let (spec, h) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &[0.5]).unwrap();
        let mut state = VariationalState::initialize(&spec, 0).unwrap();
        let err = state
            .set(h.mean, Distribution::Gamma(Gamma::new(1.0, 1.0).unwrap()))
            .unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert!(state.gamma(h.mean).is_err());
    }

    #[test]
    fn stats_without_assignments_count_every_point() {
        let (spec, _) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &[1.0, 2.0, 4.0]).unwrap();
        let state = VariationalState::initialize(&spec, 0).unwrap();
        let stats = state.component_stats(&spec).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].weight, 3.0);
        assert_eq!(stats[0].sum, 7.0);
    }

    #[test]
    fn stats_with_point_mass_assignments_partition_data() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (spec, _) = build_mixture_model(2, 0.0, 1.0, 2.0, 1.0, &[1.0], &data).unwrap();
        let state = VariationalState::initialize(&spec, 3).unwrap();
        let stats = state.component_stats(&spec).unwrap();
        let total: f64 = stats.iter().map(|s| s.weight).sum();
        let sum: f64 = stats.iter().map(|s| s.sum).sum();
        assert_eq!(total, 5.0);
        assert_eq!(sum, 15.0);
    }
}
