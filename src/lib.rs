//! l2tdevtools - build and packaging tools for the log2timeline projects
//!
//! This crate provides the library behind the `l2tdevtools` binary:
//! project and dependency definitions, download helpers for the upstream
//! release pages, source helpers, packaging file generators and the build
//! helpers of each packaging format.

pub mod builder;
pub mod core;
pub mod dependency_writers;
pub mod download_helpers;
pub mod generators;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for l2tdevtools unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a mock HTTP client and fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{DependencyDefinition, DependencyHelper, ProjectDefinition};
pub use util::config::Config;
