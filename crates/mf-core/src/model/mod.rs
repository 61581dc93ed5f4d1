//! Model declarations: variables, plates and the three model builders.

pub mod builder;
pub mod spec;

pub use builder::{
    build_gaussian_mean_model, build_gaussian_mean_precision_model, build_mixture_model,
    GaussianMeanHandles, MeanPrecisionHandles, MixtureHandles,
};
pub use spec::{
    ComponentBranch, Distribution, Family, ModelKind, ModelSpec, ObservedData, Plate,
    PrecisionSource, Role, VariableDecl, VariableId,
};
