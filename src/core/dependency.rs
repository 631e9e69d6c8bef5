//! Python dependency definitions read from `dependencies.ini` and
//! `test_dependencies.ini`, rendered for the different packaging formats.

use std::path::Path;

use anyhow::Result;

use crate::util::ini::{Ini, Section};

/// Definition of a single Python dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDefinition {
    pub dpkg_name: Option<String>,
    pub is_optional: bool,
    pub l2tbinaries_macos_name: Option<String>,
    pub l2tbinaries_name: Option<String>,
    pub maximum_version: Option<String>,
    pub minimum_version: Option<String>,
    /// Name of the Python module that provides the dependency.
    pub name: String,
    pub pypi_name: Option<String>,
    pub python2_only: bool,
    pub python3_only: bool,
    pub rpm_name: Option<String>,
    /// Version attribute or function of the module, such as `__version__`.
    pub version_property: Option<String>,
    pub skip_check: bool,
    pub skip_requires: bool,
}

impl DependencyDefinition {
    /// Create an empty definition for a dependency.
    pub fn new(name: impl Into<String>) -> Self {
        DependencyDefinition {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a definition from an INI section.
    pub fn from_section(section: &Section) -> Result<Self> {
        let string = |key: &str| section.get_string(key);
        let flag = |key: &str| -> Result<bool> { Ok(section.get_bool(key)?.unwrap_or(false)) };

        Ok(DependencyDefinition {
            dpkg_name: string("dpkg_name"),
            is_optional: flag("is_optional")?,
            l2tbinaries_macos_name: string("l2tbinaries_macos_name"),
            l2tbinaries_name: string("l2tbinaries_name"),
            maximum_version: string("maximum_version"),
            minimum_version: string("minimum_version"),
            name: section.name().to_string(),
            pypi_name: string("pypi_name"),
            python2_only: flag("python2_only")?,
            python3_only: flag("python3_only")?,
            rpm_name: string("rpm_name"),
            version_property: string("version_property"),
            skip_check: flag("skip_check")?,
            skip_requires: flag("skip_requires")?,
        })
    }
}

/// Reads dependency definitions from INI data, one per section.
#[derive(Debug, Default)]
pub struct DependencyDefinitionReader;

impl DependencyDefinitionReader {
    pub fn read(&self, ini: &Ini) -> Result<Vec<DependencyDefinition>> {
        ini.sections()
            .iter()
            .map(DependencyDefinition::from_section)
            .collect()
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<DependencyDefinition>> {
        self.read(&Ini::load(path)?)
    }
}

/// Python modules for the `extension-pkg-allow-list` of `.pylintrc`.
const PYLINT_EXTENSION_PACKAGES: &[&str] = &[
    "pybde", "pyesedb", "pyevt", "pyevtx", "pyewf", "pyexe", "pyfsapfs", "pyfsntfs", "pyfvde",
    "pyfwnt", "pyfwsi", "pylnk", "pymsiecf", "pyolecf", "pyqcow", "pyregf", "pyscca",
    "pysigscan", "pysmdev", "pysmraw", "pytsk3", "pyvhdi", "pyvmdk", "pyvshadow", "pyvslvm",
    "pywrc", "yara",
];

/// Rewrite a dpkg package name for Python 3.
fn dpkg_python3_name(name: &str) -> String {
    if name.contains("python3") {
        name.to_string()
    } else {
        name.replace("python", "python3")
    }
}

/// Rewrite an rpm package name for Python 3.
fn rpm_python3_name(name: &str) -> String {
    let mut name = if name.starts_with("python-") {
        name.replacen("python-", "python3-", 1)
    } else {
        name.replace("python2-", "python3-")
    };

    name = if name.ends_with("-python") {
        format!("{}3", name)
    } else {
        name.replace("-python2", "-python3")
    };

    name
}

/// Provides the dependencies of a project in the notations of the
/// different packaging formats.
#[derive(Debug, Clone, Default)]
pub struct DependencyHelper {
    dependencies: Vec<DependencyDefinition>,
    test_dependencies: Vec<DependencyDefinition>,
}

impl DependencyHelper {
    /// Create a helper, sorting both dependency sets by name.
    pub fn new(
        mut dependencies: Vec<DependencyDefinition>,
        mut test_dependencies: Vec<DependencyDefinition>,
    ) -> Self {
        dependencies.sort_by(|a, b| a.name.cmp(&b.name));
        test_dependencies.sort_by(|a, b| a.name.cmp(&b.name));

        DependencyHelper {
            dependencies,
            test_dependencies,
        }
    }

    /// Load `dependencies.ini` and, when it exists, `test_dependencies.ini`.
    pub fn load(dependencies_file: &Path, test_dependencies_file: &Path) -> Result<Self> {
        let reader = DependencyDefinitionReader;
        let dependencies = reader.read_file(dependencies_file)?;

        let test_dependencies = if test_dependencies_file.exists() {
            reader.read_file(test_dependencies_file)?
        } else {
            Vec::new()
        };

        Ok(Self::new(dependencies, test_dependencies))
    }

    /// The dependencies, sorted by name.
    pub fn dependencies(&self) -> &[DependencyDefinition] {
        &self.dependencies
    }

    /// The test dependencies, sorted by name.
    pub fn test_dependencies(&self) -> &[DependencyDefinition] {
        &self.test_dependencies
    }

    fn select(&self, test_dependencies: bool) -> impl Iterator<Item = &DependencyDefinition> {
        let dependencies = if test_dependencies {
            &self.test_dependencies
        } else {
            &self.dependencies
        };
        dependencies.iter().filter(|d| !d.python2_only)
    }

    /// Requirements for a Debian control file.
    pub fn dpkg_depends(&self, exclude_version: bool, test_dependencies: bool) -> Vec<String> {
        let mut requires: Vec<String> = self
            .select(test_dependencies)
            .map(|dependency| {
                let name = dpkg_python3_name(dependency.dpkg_name.as_deref().unwrap_or(&dependency.name));
                match dependency.minimum_version.as_deref() {
                    Some(minimum) if !exclude_version => format!("{} (>= {})", name, minimum),
                    _ => name,
                }
            })
            .collect();

        requires.sort();
        requires
    }

    /// Requirements for `install_requires` in setup.py and requirements.txt.
    pub fn install_requires(&self, exclude_version: bool, test_dependencies: bool) -> Vec<String> {
        let dependencies = if test_dependencies {
            &self.test_dependencies
        } else {
            &self.dependencies
        };

        let mut requires = Vec::new();
        for dependency in dependencies {
            if dependency.skip_requires {
                continue;
            }

            let name = dependency.pypi_name.as_deref().unwrap_or(&dependency.name);
            if name == "pysqlite" {
                continue;
            }

            let mut requirement = match (
                exclude_version,
                dependency.minimum_version.as_deref(),
                dependency.maximum_version.as_deref(),
            ) {
                (false, Some(minimum), None) => format!("{} >= {}", name, minimum),
                (false, Some(minimum), Some(maximum)) => {
                    format!("{} >= {},<= {}", name, minimum, maximum)
                }
                _ => name.to_string(),
            };

            if dependency.python2_only {
                requirement.push_str(" ; python_version < '3.0'");
            }
            if dependency.python3_only {
                requirement.push_str(" ; python_version > '3.0'");
            }
            requires.push(requirement);
        }

        requires.sort();
        requires
    }

    /// Requirements for an RPM spec file.
    pub fn rpm_requires(&self, exclude_version: bool, test_dependencies: bool) -> Vec<String> {
        let mut requires: Vec<String> = self
            .select(test_dependencies)
            .map(|dependency| {
                let name = rpm_python3_name(dependency.rpm_name.as_deref().unwrap_or(&dependency.name));
                match dependency.minimum_version.as_deref() {
                    Some(minimum) if !exclude_version => format!("{} >= {}", name, minimum),
                    _ => name,
                }
            })
            .collect();

        requires.sort();
        requires
    }

    /// Package names in the l2tbinaries repository for a platform such as
    /// `macos`, `win32` or `win64`.
    pub fn l2tbinaries(&self, platform: &str) -> Vec<String> {
        let mut requires: Vec<String> = self
            .select(false)
            .map(|dependency| {
                let name = if platform == "macos" {
                    dependency
                        .l2tbinaries_macos_name
                        .as_ref()
                        .or(dependency.l2tbinaries_name.as_ref())
                } else {
                    dependency.l2tbinaries_name.as_ref()
                };
                name.unwrap_or(&dependency.name).clone()
            })
            .collect();

        requires.sort();
        requires
    }

    /// Dependencies that are C extension modules pylint is allowed to load.
    pub fn pylintrc_extension_packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = self
            .dependencies
            .iter()
            .filter(|dependency| PYLINT_EXTENSION_PACKAGES.contains(&dependency.name.as_str()))
            .map(|dependency| dependency.name.clone())
            .collect();

        packages.sort();
        packages
    }
}
