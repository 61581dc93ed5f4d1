//! Coordinate-ascent scheduler.
//!
//! Sweeps visit latent variables in declaration order and replace each
//! posterior with its closed-form optimum given the *current* posteriors of
//! its neighbours. Every visit therefore maximises the ELBO along one
//! coordinate and the ELBO trace is non-decreasing up to rounding.

use super::elbo;
use super::state::{RandomVariable, VariationalState};
use super::summary::{InferenceReport, InferenceState, Posteriors};
use super::updates::{
    expected_sq_dev, update_assignment, update_mean, update_precision, update_weights,
};
use crate::logging::event_names;
use crate::model::{Distribution, ModelSpec, PrecisionSource, VariableId};
use mf_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default relative ELBO tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
/// Default sweep cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
/// Relative drop above which an ELBO decrease is reported.
const DECREASE_SLACK: f64 = 1e-9;

/// Knobs for a single inference run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    /// Converged when `|ΔELBO| <= tolerance * max(|ELBO_prev|, 1)`.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Seed for the mixture assignment initialisation.
    pub seed: u64,
    /// Independent initialisations for mixtures (`seed`, `seed + 1`, ...).
    pub restarts: usize,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        InferenceSettings {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: 0,
            restarts: 1,
        }
    }
}

impl InferenceSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::Config(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be at least 1".to_string()));
        }
        if self.restarts == 0 {
            return Err(Error::Config("restarts must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Runs CAVI over one borrowed [`ModelSpec`].
#[derive(Debug)]
pub struct Scheduler<'a> {
    spec: &'a ModelSpec,
    settings: InferenceSettings,
    seed: u64,
    state: VariationalState,
    status: InferenceState,
    iteration: usize,
    elbo_trace: Vec<f64>,
    elbo_decreases: usize,
}

impl<'a> Scheduler<'a> {
    /// Validate the model and settings and initialise with `settings.seed`.
    pub fn new(spec: &'a ModelSpec, settings: InferenceSettings) -> Result<Self> {
        Self::with_seed(spec, settings, settings.seed)
    }

    pub fn with_seed(spec: &'a ModelSpec, settings: InferenceSettings, seed: u64) -> Result<Self> {
        settings.validate()?;
        spec.validate()?;
        let state = VariationalState::initialize(spec, seed)?;
        Ok(Scheduler {
            spec,
            settings,
            seed,
            state,
            status: InferenceState::NotStarted,
            iteration: 0,
            elbo_trace: Vec::new(),
            elbo_decreases: 0,
        })
    }

    pub fn status(&self) -> InferenceState {
        self.status
    }

    /// Completed sweeps.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn elbo_trace(&self) -> &[f64] {
        &self.elbo_trace
    }

    pub fn elbo(&self) -> Option<f64> {
        self.elbo_trace.last().copied()
    }

    pub fn elbo_decreases(&self) -> usize {
        self.elbo_decreases
    }

    pub fn variables(&self) -> &[RandomVariable] {
        self.state.variables()
    }

    /// ELBO at the current state without sweeping.
    pub fn current_elbo(&self) -> Result<f64> {
        Ok(elbo::evaluate(self.spec, &self.state)?.total())
    }

    /// One full sweep followed by an ELBO evaluation.
    pub fn step(&mut self) -> Result<f64> {
        if matches!(
            self.status,
            InferenceState::Converged | InferenceState::MaxIterExceeded
        ) {
            return Err(Error::Inference(format!(
                "scheduler already finished ({})",
                self.status
            )));
        }
        self.status = InferenceState::Running;
        self.iteration += 1;
        self.sweep()?;

        let terms = elbo::evaluate(self.spec, &self.state)?;
        let value = terms.total();
        if !value.is_finite() {
            return Err(Error::NumericalInstability {
                variable: "elbo".to_string(),
                iteration: self.iteration,
                detail: format!("ELBO evaluated to {}", value),
            });
        }

        if let Some(prev) = self.elbo() {
            if prev - value > DECREASE_SLACK * value.abs().max(1.0) {
                self.elbo_decreases += 1;
                warn!(
                    target: event_names::INFER_ELBO_DECREASED,
                    iteration = self.iteration,
                    previous = prev,
                    elbo = value,
                    "ELBO decreased between sweeps"
                );
            }
        }
        debug!(
            target: event_names::INFER_SWEEP,
            iteration = self.iteration,
            elbo = value,
            log_likelihood = terms.expected_log_likelihood,
            kl_means = terms.kl_means,
            kl_precisions = terms.kl_precisions,
            kl_weights = terms.kl_weights,
            "sweep"
        );
        self.elbo_trace.push(value);
        Ok(value)
    }

    /// Sweep until converged or the cap is hit.
    pub fn run(&mut self) -> Result<InferenceState> {
        while self.status == InferenceState::NotStarted || self.status == InferenceState::Running {
            let value = self.step()?;
            let converged = match self.elbo_trace.len().checked_sub(2) {
                Some(idx) => {
                    let prev = self.elbo_trace[idx];
                    (value - prev).abs() <= self.settings.tolerance * prev.abs().max(1.0)
                }
                None => false,
            };
            if converged {
                self.status = InferenceState::Converged;
            } else if self.iteration >= self.settings.max_iterations {
                self.status = InferenceState::MaxIterExceeded;
            }
        }
        Ok(self.status)
    }

    /// Copy the current posteriors out.
    pub fn posteriors(&self) -> Posteriors {
        Posteriors::from_state(&self.state)
    }

    pub fn into_report(self) -> InferenceReport {
        let elbo = self.elbo().unwrap_or(f64::NEG_INFINITY);
        let posteriors = self.posteriors();
        InferenceReport {
            model: self.spec.kind(),
            status: self.status,
            iterations: self.iteration,
            elbo,
            elbo_trace: self.elbo_trace,
            elbo_decreases: self.elbo_decreases,
            seed: self.seed,
            restarts: self.settings.restarts,
            posteriors,
        }
    }

    fn sweep(&mut self) -> Result<()> {
        let spec = self.spec;
        let data = spec.data().values();
        // Responsibilities only change in the assignment pass, so N_j and
        // S_j hold for the whole component pass.
        let stats = self.state.component_stats(spec)?;
        let responsibilities = (0..data.len())
            .map(|i| self.state.responsibilities(spec, i))
            .collect::<Result<Vec<_>>>()?;

        for (branch, s) in spec.components().iter().zip(stats.iter()) {
            let prior = self.gaussian_prior(branch.mean)?;
            let precision = self.state.precision(branch.precision)?;
            let q = update_mean(&prior, precision, s)
                .ok_or_else(|| self.instability(branch.mean, "degenerate mean update"))?;
            self.store(branch.mean, Distribution::Gaussian(q))?;
        }

        for (j, (branch, s)) in spec.components().iter().zip(stats.iter()).enumerate() {
            let PrecisionSource::Latent(id) = branch.precision else {
                continue;
            };
            let prior = self.gamma_prior(id)?;
            let mean = *self.state.gaussian(branch.mean)?;
            let mut sq_dev = 0.0;
            for (r, &x) in responsibilities.iter().zip(data.iter()) {
                let rij = r.get(j).copied().unwrap_or(0.0);
                if rij > 0.0 {
                    sq_dev += rij * expected_sq_dev(x, &mean);
                }
            }
            let q = update_precision(&prior, s.weight, sq_dev)
                .ok_or_else(|| self.instability(id, "degenerate precision update"))?;
            self.store(id, Distribution::Gamma(q))?;
        }

        if let Some(id) = spec.weights() {
            let prior = match spec.variable(id).map(|d| &d.prior) {
                Some(Distribution::Dirichlet(d)) => d.clone(),
                _ => return Err(Error::Inference(format!("weights {} lack a Dirichlet prior", id))),
            };
            let counts: Vec<f64> = stats.iter().map(|s| s.weight).collect();
            let q = update_weights(&prior, &counts)
                .ok_or_else(|| self.instability(id, "degenerate weight update"))?;
            self.store(id, Distribution::Dirichlet(q))?;
        }

        if !spec.assignments().is_empty() {
            let expected_log_weights = match spec.weights() {
                Some(id) => self.state.dirichlet(id)?.expected_log(),
                None => Vec::new(),
            };
            let components = spec
                .components()
                .iter()
                .map(|b| Ok((*self.state.gaussian(b.mean)?, self.state.precision(b.precision)?)))
                .collect::<Result<Vec<_>>>()?;
            for (&id, &x) in spec.assignments().iter().zip(data.iter()) {
                let q = update_assignment(x, &expected_log_weights, &components)
                    .ok_or_else(|| self.instability(id, "assignment weights do not normalise"))?;
                self.store(id, Distribution::Categorical(q))?;
            }
        }

        Ok(())
    }

    fn store(&mut self, id: VariableId, posterior: Distribution) -> Result<()> {
        if !posterior.is_finite() {
            return Err(self.instability(id, "non-finite posterior parameter"));
        }
        self.state.set(id, posterior)
    }

    fn gaussian_prior(&self, id: VariableId) -> Result<mf_math::Gaussian> {
        match self.spec.variable(id).map(|d| &d.prior) {
            Some(Distribution::Gaussian(g)) => Ok(*g),
            _ => Err(Error::Inference(format!("mean {} lacks a Gaussian prior", id))),
        }
    }

    fn gamma_prior(&self, id: VariableId) -> Result<mf_math::Gamma> {
        match self.spec.variable(id).map(|d| &d.prior) {
            Some(Distribution::Gamma(g)) => Ok(*g),
            _ => Err(Error::Inference(format!("precision {} lacks a Gamma prior", id))),
        }
    }

    fn instability(&self, id: VariableId, detail: &str) -> Error {
        let variable = self
            .state
            .get(id)
            .map(|v| v.name.clone())
            .unwrap_or_else(|_| id.to_string());
        Error::NumericalInstability {
            variable,
            iteration: self.iteration,
            detail: detail.to_string(),
        }
    }
}

/// Fit `spec`, running `settings.restarts` seeded initialisations for
/// mixtures and keeping the one with the highest final ELBO.
pub fn infer(spec: &ModelSpec, settings: InferenceSettings) -> Result<InferenceReport> {
    settings.validate()?;
    let attempts = if spec.assignments().is_empty() {
        1
    } else {
        settings.restarts
    };

    info!(
        target: event_names::INFER_STARTED,
        model = %spec.kind(),
        n = spec.data().len(),
        k = spec.components().len(),
        variables = spec.variables().len(),
        tolerance = settings.tolerance,
        max_iterations = settings.max_iterations,
        seed = settings.seed,
        restarts = attempts,
        "starting inference"
    );

    let mut best: Option<InferenceReport> = None;
    for attempt in 0..attempts {
        let seed = settings.seed.wrapping_add(attempt as u64);
        let mut scheduler = Scheduler::with_seed(spec, settings, seed)?;
        scheduler.run()?;
        let report = scheduler.into_report();
        if attempts > 1 {
            info!(
                target: event_names::INFER_RESTART,
                attempt = attempt + 1,
                seed,
                status = %report.status,
                iterations = report.iterations,
                elbo = report.elbo,
                "restart finished"
            );
        }
        let better = match &best {
            Some(current) => report.elbo > current.elbo,
            None => true,
        };
        if better {
            best = Some(report);
        }
    }

    let mut report =
        best.ok_or_else(|| Error::Inference("no inference attempt was run".to_string()))?;
    report.restarts = attempts;

    info!(
        target: event_names::INFER_FINISHED,
        status = %report.status,
        iterations = report.iterations,
        elbo = report.elbo,
        elbo_decreases = report.elbo_decreases,
        seed = report.seed,
        "inference finished"
    );
    if report.elbo_decreases > 0 {
        warn!(
            target: event_names::INFER_ELBO_DECREASED,
            count = report.elbo_decreases,
            "ELBO decreased during the selected run"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        build_gaussian_mean_model, build_gaussian_mean_precision_model, build_mixture_model,
    };

    #[test]
    fn known_precision_converges_on_second_sweep() {
        let data = [1.0, 2.0, 3.0];
        let (spec, h) = build_gaussian_mean_model(0.0, 1.0, 1.0, &data).unwrap();
        let mut s = Scheduler::new(&spec, InferenceSettings::default()).unwrap();
        assert_eq!(s.status(), InferenceState::NotStarted);
        assert_eq!(s.run().unwrap(), InferenceState::Converged);
        assert_eq!(s.iteration(), 2);
        let post = s.posteriors().gaussian(h.mean).unwrap();
        assert!((post.mean - 1.5).abs() < 1e-12);
        assert!((post.precision - 4.0).abs() < 1e-12);
    }

    #[test]
    fn iteration_cap_reports_max_iter() {
        let data = [-2.0, -1.9, 0.0, 2.1, 2.0, 5.0];
        let (spec, _) = build_mixture_model(3, 0.0, 1.0, 2.0, 1.0, &[1.0], &data).unwrap();
        let settings = InferenceSettings {
            max_iterations: 1,
            ..Default::default()
        };
        let mut s = Scheduler::new(&spec, settings).unwrap();
        assert_eq!(s.run().unwrap(), InferenceState::MaxIterExceeded);
        assert_eq!(s.elbo_trace().len(), 1);
        assert!(s.step().is_err());
    }

    #[test]
    fn elbo_trace_non_decreasing_mean_precision() {
        let data: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64 * 0.3 - 1.0).collect();
        let (spec, _) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &data).unwrap();
        let mut s = Scheduler::new(&spec, InferenceSettings::default()).unwrap();
        s.run().unwrap();
        for w in s.elbo_trace().windows(2) {
            assert!(w[1] >= w[0] - 1e-9 * w[0].abs().max(1.0), "{:?}", w);
        }
        assert_eq!(s.elbo_decreases(), 0);
    }

    #[test]
    fn zero_tolerance_runs_to_cap_or_exact_fixpoint() {
        let (spec, _) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &[1.0, 3.0]).unwrap();
        let settings = InferenceSettings {
            tolerance: 0.0,
            max_iterations: 25,
            ..Default::default()
        };
        let mut s = Scheduler::new(&spec, settings).unwrap();
        s.run().unwrap();
        assert!(s.iteration() <= 25);
    }

    #[test]
    fn invalid_settings_rejected() {
        let (spec, _) = build_gaussian_mean_model(0.0, 1.0, 1.0, &[1.0]).unwrap();
        for bad in [
            InferenceSettings { tolerance: -1.0, ..Default::default() },
            InferenceSettings { max_iterations: 0, ..Default::default() },
            InferenceSettings { restarts: 0, ..Default::default() },
        ] {
            assert!(matches!(Scheduler::new(&spec, bad), Err(Error::Config(_))));
        }
    }

    #[test]
    fn restarts_keep_best_elbo() {
        let data = [-5.0, -4.8, -5.2, 0.1, -0.1, 0.0, 5.0, 5.1, 4.9];
        let (spec, _) = build_mixture_model(3, 0.0, 0.01, 2.0, 1.0, &[1.0], &data).unwrap();
        let single = infer(&spec, InferenceSettings::default()).unwrap();
        let multi = infer(
            &spec,
            InferenceSettings {
                restarts: 4,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(multi.elbo >= single.elbo);
        assert_eq!(multi.restarts, 4);
        assert!(multi.seed < 4);
    }

    #[test]
    fn restarts_ignored_without_assignments() {
        let (spec, _) = build_gaussian_mean_model(0.0, 1.0, 1.0, &[1.0]).unwrap();
        let report = infer(
            &spec,
            InferenceSettings {
                restarts: 5,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(report.restarts, 1);
    }

    #[test]
    fn same_seed_same_result() {
        let data = [-3.0, -2.0, 2.0, 3.0, 8.0];
        let (spec, _) = build_mixture_model(2, 0.0, 0.1, 2.0, 1.0, &[1.0], &data).unwrap();
        let a = infer(&spec, InferenceSettings::default()).unwrap();
        let b = infer(&spec, InferenceSettings::default()).unwrap();
        assert_eq!(a.elbo_trace, b.elbo_trace);
        assert_eq!(a.posteriors, b.posteriors);
    }
}
