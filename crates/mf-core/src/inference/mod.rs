//! Mean-field variational inference.
//!
//! - [`updates`]: closed-form conjugate coordinate updates
//! - [`state`]: per-variable posteriors owned by a run
//! - [`elbo`]: evidence lower bound
//! - [`scheduler`]: sweep loop, convergence and restarts
//! - [`summary`]: immutable posterior snapshots and the run report

pub mod elbo;
pub mod scheduler;
pub mod state;
pub mod summary;
pub mod updates;

pub use elbo::ElboTerms;
pub use scheduler::{infer, InferenceSettings, Scheduler, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
pub use state::{RandomVariable, VariationalState};
pub use summary::{
    CategoricalSummary, DirichletSummary, GammaSummary, GaussianSummary, InferenceReport,
    InferenceState, NamedPosterior, PosteriorSummary, Posteriors,
};
pub use updates::{update_mean, ComponentStats, PrecisionExpectation};
