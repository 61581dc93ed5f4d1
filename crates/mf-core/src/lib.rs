//! Meanfield core library.
//!
//! Mean-field variational inference for a small family of
//! conjugate-exponential Gaussian models: declare a model with one of the
//! builders in [`model`], fit it with [`inference::infer`], and read typed
//! posterior summaries from the returned report.

pub mod config;
pub mod exit_codes;
pub mod inference;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod report;
pub mod synth;

pub use inference::{infer, InferenceReport, InferenceSettings, InferenceState, Posteriors};
pub use model::{
    build_gaussian_mean_model, build_gaussian_mean_precision_model, build_mixture_model,
    ModelKind, ModelSpec,
};
