//! High-level operations.
//!
//! This module contains the implementation of the l2tdevtools commands.

pub mod build;
pub mod dpkg_generate;
pub mod update_dependencies;

pub use build::{build, BuildOptions, BuildSummary, ProjectBuilder, Target};
pub use dpkg_generate::{dpkg_generate, DpkgGenerateOptions, DpkgGenerateResult};
pub use update_dependencies::{update_dependencies, UpdateDependenciesOptions};
