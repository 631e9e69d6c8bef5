//! Project definitions read from `projects.ini`.
//!
//! Each INI section describes one upstream project: where to download it,
//! how it is built and how its packages are named per packaging format.

use std::fmt;
use std::path::Path;

use anyhow::Result;

use crate::core::version::ProjectVersionDefinition;
use crate::util::ini::{Ini, Section};

/// How the upstream project is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildSystem {
    /// autotools style `./configure && make`
    ConfigureMake,
    /// setuptools driven by a `setup.py`
    SetupPy,
    /// PEP 517 `pyproject.toml`
    Pyproject,
    Poetry,
    Flit,
    /// setuptools without a `setup.py`
    Setuptools,
    /// A value no build helper knows about.
    Unrecognized(String),
}

impl BuildSystem {
    /// Parse a `build_system` value. Unknown values are kept.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "configure_make" => BuildSystem::ConfigureMake,
            "setup_py" => BuildSystem::SetupPy,
            "pyproject" => BuildSystem::Pyproject,
            "poetry" => BuildSystem::Poetry,
            "flit" => BuildSystem::Flit,
            "setuptools" => BuildSystem::Setuptools,
            _ => BuildSystem::Unrecognized(s.to_string()),
        }
    }

    /// Get the build system name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            BuildSystem::ConfigureMake => "configure_make",
            BuildSystem::SetupPy => "setup_py",
            BuildSystem::Pyproject => "pyproject",
            BuildSystem::Poetry => "poetry",
            BuildSystem::Flit => "flit",
            BuildSystem::Setuptools => "setuptools",
            BuildSystem::Unrecognized(value) => value,
        }
    }

    /// Whether the project is a Python project.
    pub fn is_python(&self) -> bool {
        matches!(
            self,
            BuildSystem::SetupPy
                | BuildSystem::Pyproject
                | BuildSystem::Poetry
                | BuildSystem::Flit
                | BuildSystem::Setuptools
        )
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a single project.
#[derive(Debug, Clone, Default)]
pub struct ProjectDefinition {
    pub architecture_dependent: bool,
    pub build_dependencies: Vec<String>,
    pub build_system: Option<BuildSystem>,
    pub configure_options: Vec<String>,
    pub description_long: Option<String>,
    pub description_short: Option<String>,
    /// Build targets the project is not built for, or `all`.
    pub disabled: Vec<String>,
    pub download_url: String,
    pub dpkg_build_dependencies: Vec<String>,
    pub dpkg_configure_options: Vec<String>,
    pub dpkg_dependencies: Vec<String>,
    pub dpkg_name: Option<String>,
    pub dpkg_source_name: Option<String>,
    pub dpkg_template_additional: Vec<String>,
    pub dpkg_template_control: Option<String>,
    pub dpkg_template_install: Vec<String>,
    pub dpkg_template_install_python3: Vec<String>,
    pub dpkg_template_py3dist_overrides: Option<String>,
    pub dpkg_template_rules: Option<String>,
    pub dpkg_template_source_options: Option<String>,
    pub git_url: Option<String>,
    pub homepage_url: Option<String>,
    pub maintainer: Option<String>,
    pub msi_name: Option<String>,
    pub msi_prebuild: Option<String>,
    pub name: String,
    pub optional_build_dependencies: Vec<String>,
    pub patches: Vec<String>,
    pub pkg_configure_options: Vec<String>,
    pub pypi_name: Option<String>,
    pub pypi_source_name: Option<String>,
    pub rpm_build_dependencies: Vec<String>,
    pub rpm_dependencies: Vec<String>,
    pub rpm_name: Option<String>,
    pub rpm_template_spec: Option<String>,
    pub setup_name: Option<String>,
    pub srpm_name: Option<String>,
    pub version: ProjectVersionDefinition,
    pub wheel_name: Option<String>,
}

impl ProjectDefinition {
    /// Create an empty definition for a project.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectDefinition {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a definition from an INI section.
    pub fn from_section(section: &Section) -> Result<Self> {
        let list = |key: &str| section.get_list(key);
        let string = |key: &str| section.get_string(key);

        Ok(ProjectDefinition {
            architecture_dependent: section.get_bool("architecture_dependent")?.unwrap_or(false),
            build_dependencies: list("build_dependencies"),
            build_system: string("build_system").map(|value| BuildSystem::parse(&value)),
            configure_options: list("configure_options"),
            description_long: string("description_long"),
            description_short: string("description_short"),
            disabled: list("disabled"),
            download_url: string("download_url").unwrap_or_default(),
            dpkg_build_dependencies: list("dpkg_build_dependencies"),
            dpkg_configure_options: list("dpkg_configure_options"),
            dpkg_dependencies: list("dpkg_dependencies"),
            dpkg_name: string("dpkg_name"),
            dpkg_source_name: string("dpkg_source_name"),
            dpkg_template_additional: list("dpkg_template_additional"),
            dpkg_template_control: string("dpkg_template_control"),
            dpkg_template_install: list("dpkg_template_install"),
            dpkg_template_install_python3: list("dpkg_template_install_python3"),
            dpkg_template_py3dist_overrides: string("dpkg_template_py3dist_overrides"),
            dpkg_template_rules: string("dpkg_template_rules"),
            dpkg_template_source_options: string("dpkg_template_source_options"),
            git_url: string("git_url"),
            homepage_url: string("homepage_url"),
            maintainer: string("maintainer"),
            msi_name: string("msi_name"),
            msi_prebuild: string("msi_prebuild"),
            name: section.name().to_string(),
            optional_build_dependencies: list("optional_build_dependencies"),
            patches: list("patches"),
            pkg_configure_options: list("pkg_configure_options"),
            pypi_name: string("pypi_name"),
            pypi_source_name: string("pypi_source_name"),
            rpm_build_dependencies: list("rpm_build_dependencies"),
            rpm_dependencies: list("rpm_dependencies"),
            rpm_name: string("rpm_name"),
            rpm_template_spec: string("rpm_template_spec"),
            setup_name: string("setup_name"),
            srpm_name: string("srpm_name"),
            version: ProjectVersionDefinition::new(&string("version").unwrap_or_default()),
            wheel_name: string("wheel_name"),
        })
    }

    /// Whether building `target` is disabled for this project.
    pub fn is_disabled_for(&self, target: &str) -> bool {
        self.disabled.iter().any(|d| d == target || d == "all")
    }

    /// Name used for the Debian source package.
    pub fn dpkg_source_name(&self) -> &str {
        self.dpkg_source_name.as_deref().unwrap_or(&self.name)
    }

    /// Name of the Python module as installed by setup.py.
    pub fn setup_name(&self) -> &str {
        self.setup_name.as_deref().unwrap_or(&self.name)
    }

    /// `configure_options` joined for a command line.
    pub fn configure_options_string(&self) -> String {
        self.configure_options.join(" ")
    }
}

/// Reads project definitions from INI data.
#[derive(Debug, Default)]
pub struct ProjectDefinitionReader;

impl ProjectDefinitionReader {
    /// Read definitions in section order.
    ///
    /// Sections without a `download_url` are skipped.
    pub fn read(&self, ini: &Ini) -> Result<Vec<ProjectDefinition>> {
        let mut definitions = Vec::new();

        for section in ini.sections() {
            let definition = ProjectDefinition::from_section(section)?;

            // Need at minimum a name and a download URL.
            if definition.name.is_empty() || definition.download_url.is_empty() {
                tracing::debug!("Skipping project without download URL: {}", definition.name);
                continue;
            }
            definitions.push(definition);
        }

        Ok(definitions)
    }

    /// Read definitions from a file.
    pub fn read_file(&self, path: &Path) -> Result<Vec<ProjectDefinition>> {
        let ini = Ini::load(path)?;
        self.read(&ini)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::VersionOperator;
    use crate::test_support::PROJECTS_INI;

    #[test]
    fn test_read_projects() {
        let ini = Ini::parse(PROJECTS_INI).unwrap();
        let projects = ProjectDefinitionReader.read(&ini).unwrap();

        let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["dfvfs", "libyal", "zlib"]);

        let dfvfs = &projects[0];
        assert_eq!(dfvfs.build_system, Some(BuildSystem::SetupPy));
        assert_eq!(dfvfs.dpkg_dependencies, vec!["python3-dfdatetime", "python3-six"]);
        assert_eq!(
            dfvfs.version.earliest_version().unwrap().operator,
            VersionOperator::GreaterEqual
        );
        assert!(!dfvfs.architecture_dependent);

        let libyal = &projects[1];
        assert_eq!(libyal.build_system, Some(BuildSystem::ConfigureMake));
        assert!(libyal.architecture_dependent);
        assert_eq!(libyal.build_dependencies, vec!["zlib", "bzip2"]);
        assert_eq!(libyal.dpkg_source_name(), "libyal");
    }

    #[test]
    fn test_section_without_download_url_is_skipped() {
        let ini = Ini::parse("[nourl]\nbuild_system: setup_py\n").unwrap();
        assert!(ProjectDefinitionReader.read(&ini).unwrap().is_empty());
    }

    #[test]
    fn test_unrecognized_build_system() {
        let ini = Ini::parse("[odd]\nbuild_system: scons\ndownload_url: http://www.zlib.net\n")
            .unwrap();
        let projects = ProjectDefinitionReader.read(&ini).unwrap();

        assert_eq!(
            projects[0].build_system,
            Some(BuildSystem::Unrecognized("scons".to_string()))
        );
    }

    #[test]
    fn test_is_disabled_for() {
        let mut definition = ProjectDefinition::new("pytsk3");
        definition.disabled = vec!["msi".to_string()];
        assert!(definition.is_disabled_for("msi"));
        assert!(!definition.is_disabled_for("dpkg"));

        definition.disabled = vec!["all".to_string()];
        assert!(definition.is_disabled_for("dpkg"));
    }
}
