//! Core data structures for l2tdevtools.
//!
//! This module contains the definitions read from the configuration files:
//! - Projects and their version constraints
//! - Python dependencies
//! - Presets of projects
//! - The configuration of a project whose dependency files are updated

pub mod dependency;
pub mod preset;
pub mod project;
pub mod project_config;
pub mod version;

pub use dependency::{DependencyDefinition, DependencyHelper};
pub use preset::{preset_project_names, PresetDefinition, PresetDefinitionReader};
pub use project::{BuildSystem, ProjectDefinition, ProjectDefinitionReader};
pub use project_config::{ProjectConfiguration, ProjectConfigurationReader};
pub use version::{version_tuple, ProjectVersionDefinition, VersionClause, VersionOperator};
