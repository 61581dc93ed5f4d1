//! Core math modules.

pub mod stable;
pub mod gaussian;
pub mod gamma;
pub mod dirichlet;
pub mod categorical;
