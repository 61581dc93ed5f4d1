//! Numerical primitives and conjugate exponential-family distributions.

pub mod math;

pub use math::stable::*;
pub use math::gaussian::{gaussian_log_pdf, Gaussian};
pub use math::gamma::*;
pub use math::dirichlet::Dirichlet;
pub use math::categorical::Categorical;
