//! Command implementations

pub mod build;
pub mod completions;
pub mod dpkg_generate;
pub mod update_dependencies;

use std::path::{Path, PathBuf};

use l2tdevtools::util::config::Config;

/// Directory with projects.ini, presets.ini and the packaging templates.
const DEFAULT_DATA_DIRECTORY: &str = "data";

/// Resolve the data directory: the flag, then the config, then `data`.
pub(crate) fn data_directory(flag: Option<PathBuf>, config: &Config, cwd: &Path) -> PathBuf {
    let directory = flag
        .or_else(|| config.build.config_directory.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIRECTORY));
    cwd.join(directory)
}
