//! Configuration of the project whose dependency files are updated, read
//! from the `[project]` section of `{project_name}.ini` in its root.

use std::path::Path;

use anyhow::{Context, Result};

use crate::util::ini::Ini;

pub const DEFAULT_STATUS: &str = "alpha";

/// Configuration of a project maintained with l2tdevtools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfiguration {
    pub description_long: String,
    pub description_short: String,
    pub git_url: String,
    pub homepage_url: String,
    /// Name and email address, such as `Name <name@example.com>`.
    pub maintainer: String,
    pub name: String,
    /// Name of the project to use in descriptions.
    pub name_description: String,
    /// AppVeyor encrypted PyPI token.
    pub pypi_token: Option<String>,
    /// Development status: experimental, alpha, beta or stable.
    pub status: String,
}

impl ProjectConfiguration {
    /// Create a configuration with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectConfiguration {
            description_long: String::new(),
            description_short: String::new(),
            git_url: String::new(),
            homepage_url: String::new(),
            maintainer: String::new(),
            name: name.into(),
            name_description: String::new(),
            pypi_token: None,
            status: DEFAULT_STATUS.to_string(),
        }
    }

    /// Name of the Python module, `-kb` projects ship an `rc` module.
    pub fn python_module_name(&self) -> String {
        match self.name.strip_suffix("-kb") {
            Some(prefix) => format!("{}rc", prefix),
            None => self.name.clone(),
        }
    }

    /// Maintainer split into name and email address.
    pub fn maintainer_name_and_email(&self) -> (&str, &str) {
        match self.maintainer.split_once('<') {
            Some((name, email)) => (name.trim_end(), email.strip_suffix('>').unwrap_or(email)),
            None => (self.maintainer.trim_end(), ""),
        }
    }

    /// Trove classifier of the development status.
    pub fn development_status(&self) -> &'static str {
        match self.status.as_str() {
            "experimental" => "Development Status :: 2 - Pre-Alpha",
            "alpha" => "Development Status :: 3 - Alpha",
            "beta" => "Development Status :: 4 - Beta",
            "stable" => "Development Status :: 5 - Production/Stable",
            _ => "",
        }
    }
}

/// Reads the `[project]` section of a project configuration file.
#[derive(Debug, Default)]
pub struct ProjectConfigurationReader;

impl ProjectConfigurationReader {
    /// Read a configuration, `default_name` is used when it has no `name`.
    pub fn read(&self, ini: &Ini, default_name: &str) -> Result<ProjectConfiguration> {
        let mut configuration = ProjectConfiguration::new(default_name);

        let Some(section) = ini.section("project") else {
            return Ok(configuration);
        };

        let string = |key: &str| section.get_string(key).unwrap_or_default();

        configuration.description_long = string("description_long");
        configuration.description_short = string("description_short");
        configuration.git_url = string("git_url");
        configuration.homepage_url = string("homepage_url");
        configuration.maintainer = string("maintainer");
        if let Some(name) = section.get_string("name") {
            configuration.name = name;
        }
        configuration.name_description = section
            .get_string("name_description")
            .unwrap_or_else(|| configuration.name.clone());
        configuration.pypi_token = section.get_string("pypi_token");
        if let Some(status) = section.get_string("status") {
            configuration.status = status;
        }

        Ok(configuration)
    }

    /// Read a configuration from a file.
    pub fn read_file(&self, path: &Path, default_name: &str) -> Result<ProjectConfiguration> {
        let ini = Ini::load(path)
            .with_context(|| format!("Unable to read project configuration: {}", path.display()))?;
        self.read(&ini, default_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT_INI: &str = "\
[project]
name: dfvfs
name_description: dfVFS
maintainer: Log2Timeline maintainers <log2timeline-maintainers@googlegroups.com>
homepage_url: https://github.com/log2timeline/dfvfs
git_url: https://github.com/log2timeline/dfvfs.git
description_short: Digital Forensics Virtual File System (dfVFS).
description_long: dfVFS, or Digital Forensics Virtual File System,
                  provides read-only access to file-system objects.
status: beta
";

    #[test]
    fn test_read() {
        let ini = Ini::parse(PROJECT_INI).unwrap();
        let configuration = ProjectConfigurationReader.read(&ini, "unused").unwrap();

        assert_eq!(configuration.name, "dfvfs");
        assert_eq!(configuration.name_description, "dfVFS");
        assert_eq!(
            configuration.description_long,
            "dfVFS, or Digital Forensics Virtual File System,\nprovides read-only access to file-system objects."
        );
        assert_eq!(configuration.status, "beta");
        assert_eq!(configuration.development_status(), "Development Status :: 4 - Beta");
        assert_eq!(configuration.pypi_token, None);
        assert_eq!(
            configuration.maintainer_name_and_email(),
            ("Log2Timeline maintainers", "log2timeline-maintainers@googlegroups.com")
        );
    }

    #[test]
    fn test_read_without_project_section() {
        let ini = Ini::parse("[other]\nname: x\n").unwrap();
        let configuration = ProjectConfigurationReader.read(&ini, "plaso").unwrap();

        assert_eq!(configuration.name, "plaso");
        assert_eq!(configuration.status, DEFAULT_STATUS);
        assert_eq!(configuration.development_status(), "Development Status :: 3 - Alpha");
    }

    #[test]
    fn test_python_module_name() {
        assert_eq!(ProjectConfiguration::new("winreg-kb").python_module_name(), "winregrc");
        assert_eq!(ProjectConfiguration::new("dfvfs").python_module_name(), "dfvfs");
    }
}
