//! Configuration file support for l2tdevtools.
//!
//! Two configuration file locations are read:
//! - Global: `~/.l2tdevtools/config.toml` - User-wide defaults
//! - Project: `.l2tdevtools/config.toml` - Working directory overrides
//!
//! Project config takes precedence over global config. Command line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default Ubuntu distribution for source packages.
pub const DEFAULT_DISTRIBUTION: &str = "jammy";

/// Default version suffix for source packages.
pub const DEFAULT_VERSION_SUFFIX: &str = "ppa1";

/// Default Open Build Service project.
pub const DEFAULT_OSC_PROJECT: &str = "home:joachimmetz:testing";

/// l2tdevtools configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Debian packaging settings
    pub dpkg: DpkgConfig,

    /// Open Build Service settings
    pub osc: OscConfig,

    /// Network settings
    pub net: NetConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory where source packages are extracted and built
    pub build_directory: Option<PathBuf>,

    /// Directory where source packages are downloaded to
    pub downloads_directory: Option<PathBuf>,

    /// Directory containing projects.ini, presets.ini and the templates
    pub config_directory: Option<PathBuf>,

    /// Distributions to build dpkg-source packages for
    pub distributions: Vec<String>,
}

/// Debian packaging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DpkgConfig {
    /// Distribution used when none is given
    pub default_distribution: String,

    /// Suffix appended to source package versions
    pub version_suffix: String,

    /// Maintainer written into generated changelogs
    pub maintainer: Option<String>,
}

impl Default for DpkgConfig {
    fn default() -> Self {
        DpkgConfig {
            default_distribution: DEFAULT_DISTRIBUTION.to_string(),
            version_suffix: DEFAULT_VERSION_SUFFIX.to_string(),
            maintainer: None,
        }
    }
}

/// Open Build Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    /// Project packages are committed to
    pub project: String,
}

impl Default for OscConfig {
    fn default() -> Self {
        OscConfig {
            project: DEFAULT_OSC_PROJECT.to_string(),
        }
    }
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// User agent sent with HTTP requests
    pub user_agent: Option<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            toml::to_string_pretty(self).with_context(|| "failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Values equal to their default do not override.
    pub fn merge(&mut self, other: Config) {
        // Build settings
        if other.build.build_directory.is_some() {
            self.build.build_directory = other.build.build_directory;
        }
        if other.build.downloads_directory.is_some() {
            self.build.downloads_directory = other.build.downloads_directory;
        }
        if other.build.config_directory.is_some() {
            self.build.config_directory = other.build.config_directory;
        }
        if !other.build.distributions.is_empty() {
            self.build.distributions = other.build.distributions;
        }

        // Dpkg settings
        if other.dpkg.default_distribution != DEFAULT_DISTRIBUTION {
            self.dpkg.default_distribution = other.dpkg.default_distribution;
        }
        if other.dpkg.version_suffix != DEFAULT_VERSION_SUFFIX {
            self.dpkg.version_suffix = other.dpkg.version_suffix;
        }
        if other.dpkg.maintainer.is_some() {
            self.dpkg.maintainer = other.dpkg.maintainer;
        }

        // OSC settings
        if other.osc.project != DEFAULT_OSC_PROJECT {
            self.osc.project = other.osc.project;
        }

        // Net settings
        if other.net.user_agent.is_some() {
            self.net.user_agent = other.net.user_agent;
        }
        if other.net.timeout_secs.is_some() {
            self.net.timeout_secs = other.net.timeout_secs;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.l2tdevtools/config.toml)
/// 2. Global config (~/.l2tdevtools/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config directory (~/.l2tdevtools).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".l2tdevtools"))
}

/// Get the global config path (~/.l2tdevtools/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.l2tdevtools/config.toml).
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(".l2tdevtools").join("config.toml")
}

/// Load the configuration that applies to the given working directory.
pub fn load_for(root: &Path) -> Config {
    let global = global_config_path();
    load_config(global.as_deref(), &project_config_path(root))
}
