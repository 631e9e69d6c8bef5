//! Writers of the files of a project that are derived from its dependency
//! definitions and its project configuration.
//!
//! Every writer renders a template. A template file in
//! `{data}/templates/` takes precedence over the built-in template of the
//! same name.

pub mod appveyor;
pub mod dpkg;
pub mod gift;
pub mod github_actions;
pub mod pylint_rc;
pub mod requirements;
pub mod setup;
pub mod sphinx_docs;
pub mod tox_ini;
pub mod travis;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::{DependencyHelper, ProjectConfiguration};
use crate::util::fs::{read_to_string, write_string};
use crate::util::template::substitute;

pub use appveyor::AppveyorYmlWriter;
pub use dpkg::{DpkgCompatWriter, DpkgControlWriter, DpkgRulesWriter};
pub use gift::{GiftCoprInstallScriptWriter, GiftPpaInstallScriptWriter};
pub use github_actions::{
    GitHubActionsTestDockerYmlWriter, GitHubActionsTestDocsYmlWriter, GitHubActionsTestToxYmlWriter,
};
pub use pylint_rc::PylintRcWriter;
pub use requirements::{RequirementsWriter, TestRequirementsWriter};
pub use setup::{PyprojectTomlWriter, SetupCfgWriter, SetupPyWriter};
pub use sphinx_docs::{SphinxBuildConfigurationWriter, SphinxBuildRequirementsWriter};
pub use tox_ini::ToxIniWriter;
pub use travis::{TravisInstallScriptWriter, TravisYmlWriter};

/// A file derived from the dependency definitions of a project.
pub trait DependencyFileWriter {
    /// Path of the written file, relative to the project directory.
    fn path(&self) -> &'static str;

    /// Render the file for the project in `project_path`.
    fn generate(&self, project_path: &Path) -> Result<String>;

    /// Write the file into the project directory, replacing an existing one.
    fn write(&self, project_path: &Path) -> Result<()> {
        let content = self.generate(project_path)?;
        write_string(&project_path.join(self.path()), &content)
    }
}

/// What the dependency file writers share: the project configuration, the
/// dependencies and the data directory holding the templates.
#[derive(Debug, Clone)]
pub struct WriterContext<'a> {
    data_path: PathBuf,
    project: &'a ProjectConfiguration,
    dependency_helper: &'a DependencyHelper,
}

impl<'a> WriterContext<'a> {
    pub fn new(
        data_path: impl Into<PathBuf>,
        project: &'a ProjectConfiguration,
        dependency_helper: &'a DependencyHelper,
    ) -> Self {
        WriterContext {
            data_path: data_path.into(),
            project,
            dependency_helper,
        }
    }

    pub fn project(&self) -> &ProjectConfiguration {
        self.project
    }

    pub fn dependency_helper(&self) -> &DependencyHelper {
        self.dependency_helper
    }

    /// Read `{data}/templates/{filename}`, or the built-in `template` when
    /// there is no such file.
    pub fn read_template(&self, filename: &str, template: &str) -> Result<String> {
        let path = self.data_path.join("templates").join(filename);
        if path.is_file() {
            read_to_string(&path)
        } else {
            Ok(template.to_string())
        }
    }

    /// Fill in the `$name` slots of `{data}/templates/{filename}`, or of the
    /// built-in `template` when there is no such file.
    pub fn generate_from_template(
        &self,
        filename: &str,
        template: &str,
        mappings: &[(&str, &str)],
    ) -> Result<String> {
        let template = self.read_template(filename, template)?;
        substitute(&template, mappings).with_context(|| {
            format!(
                "Unable to format template: {}",
                self.data_path.join("templates").join(filename).display()
            )
        })
    }

    /// PyPI requirements of the project.
    pub fn pypi_python_dependencies(&self, exclude_version: bool) -> Vec<String> {
        self.dependency_helper.install_requires(exclude_version, false)
    }

    /// PyPI requirements of the tests that are not already project
    /// requirements.
    pub fn pypi_test_dependencies(&self, python_dependencies: &[String], exclude_version: bool) -> Vec<String> {
        self.dependency_helper
            .install_requires(exclude_version, true)
            .into_iter()
            .filter(|dependency| !python_dependencies.contains(dependency))
            .collect()
    }

    /// Debian package names of the Python dependencies.
    pub fn dpkg_python_dependencies(&self) -> Vec<String> {
        self.dependency_helper.dpkg_depends(true, false)
    }

    /// Debian package names of the test dependencies that are not already
    /// Python dependencies.
    pub fn dpkg_test_dependencies(&self, python_dependencies: &[String]) -> Vec<String> {
        self.dependency_helper
            .dpkg_depends(true, true)
            .into_iter()
            .filter(|dependency| !python_dependencies.contains(dependency))
            .collect()
    }

    /// Debian packages with the headers needed to build Python dependencies
    /// from source.
    pub fn dpkg_dev_dependencies(&self) -> Vec<String> {
        let python_dependencies = self.dpkg_python_dependencies();
        let has = |name: &str| python_dependencies.iter().any(|dependency| dependency == name);

        let mut dev_dependencies = Vec::new();
        if has("python3-snappy") {
            dev_dependencies.push("libsnappy-dev".to_string());
        }
        if has("python3-yara") {
            dev_dependencies.push("libssl-dev".to_string());
        }
        if has("python3-xattr") {
            dev_dependencies.push("libffi-dev".to_string());
        }
        dev_dependencies
    }

    /// RPM package names of the Python dependencies.
    pub fn rpm_python_dependencies(&self) -> Vec<String> {
        self.dependency_helper.rpm_requires(true, false)
    }

    /// RPM package names of the test dependencies that are not already
    /// Python dependencies.
    pub fn rpm_test_dependencies(&self, python_dependencies: &[String]) -> Vec<String> {
        let mut test_dependencies = self.dependency_helper.rpm_requires(true, true);
        test_dependencies.push("python3-setuptools".to_string());
        test_dependencies.sort();

        test_dependencies
            .into_iter()
            .filter(|dependency| !python_dependencies.contains(dependency))
            .collect()
    }
}

/// Sorted, deduplicated and space separated.
pub(crate) fn join_unique(dependencies: impl IntoIterator<Item = String>) -> String {
    dependencies
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `path` is a directory containing a `.yaml` file at any depth.
pub(crate) fn has_yaml_files(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    Ok(!crate::util::fs::glob_files(path, &["**/*.yaml".to_string()])?.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::DependencyDefinition;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) fn dependency(name: &str, minimum_version: Option<&str>) -> DependencyDefinition {
        let mut definition = DependencyDefinition::new(name);
        definition.minimum_version = minimum_version.map(str::to_string);
        definition
    }

    /// A dfvfs-like project configuration.
    pub(crate) fn project(name: &str) -> ProjectConfiguration {
        let mut project = ProjectConfiguration::new(name);
        project.description_long = "Digital Forensics Virtual File System\nread-only access".to_string();
        project.description_short = "Digital Forensics Virtual File System (dfVFS).".to_string();
        project.homepage_url = format!("https://github.com/log2timeline/{}", name);
        project.maintainer = "Log2Timeline maintainers <log2timeline-maintainers@googlegroups.com>".to_string();
        project.name_description = "dfVFS".to_string();
        project
    }

    /// Dependencies with a libyal Python binding, and an overlapping test
    /// dependency.
    pub(crate) fn helper() -> DependencyHelper {
        let mut pyewf = dependency("pyewf", Some("20131210"));
        pyewf.dpkg_name = Some("libewf-python3".to_string());
        pyewf.rpm_name = Some("libewf-python3".to_string());

        let mut yaml = dependency("yaml", Some("3.10"));
        yaml.dpkg_name = Some("python3-yaml".to_string());
        yaml.pypi_name = Some("PyYAML".to_string());
        yaml.rpm_name = Some("python3-pyyaml".to_string());

        let mut mock = dependency("mock", Some("2.0.0"));
        mock.dpkg_name = Some("python3-mock".to_string());
        mock.rpm_name = Some("python3-mock".to_string());

        DependencyHelper::new(vec![pyewf, yaml.clone()], vec![mock, yaml])
    }

    #[test]
    fn test_generate_from_template() {
        let tmp = TempDir::new().unwrap();
        let helper = DependencyHelper::default();
        let project = project("plaso");
        let context = WriterContext::new(tmp.path(), &project, &helper);

        let output = context
            .generate_from_template("setup.cfg", "name = $project_name\n", &[("project_name", "plaso")])
            .unwrap();
        assert_eq!(output, "name = plaso\n");

        fs::create_dir(tmp.path().join("templates")).unwrap();
        fs::write(
            tmp.path().join("templates").join("setup.cfg"),
            "[metadata]\nname = $project_name\n",
        )
        .unwrap();

        let output = context
            .generate_from_template("setup.cfg", "unused", &[("project_name", "plaso")])
            .unwrap();
        assert_eq!(output, "[metadata]\nname = plaso\n");

        let error = context.generate_from_template("setup.cfg", "", &[]).unwrap_err();
        assert!(format!("{:#}", error).contains("Unable to format template"));
    }

    #[test]
    fn test_pypi_test_dependencies() {
        let helper = DependencyHelper::new(
            vec![dependency("pyyaml", Some("3.10"))],
            vec![dependency("mock", None), dependency("pyyaml", Some("3.10"))],
        );
        let project = project("plaso");
        let context = WriterContext::new("data", &project, &helper);

        let python_dependencies = context.pypi_python_dependencies(false);
        assert_eq!(python_dependencies, vec!["pyyaml >= 3.10".to_string()]);
        assert_eq!(
            context.pypi_test_dependencies(&python_dependencies, false),
            vec!["mock".to_string()]
        );
    }

    #[test]
    fn test_dpkg_and_rpm_dependencies() {
        let helper = helper();
        let project = project("dfvfs");
        let context = WriterContext::new("data", &project, &helper);

        let dpkg_dependencies = context.dpkg_python_dependencies();
        assert_eq!(dpkg_dependencies, vec!["libewf-python3", "python3-yaml"]);
        assert_eq!(context.dpkg_test_dependencies(&dpkg_dependencies), vec!["python3-mock"]);

        let rpm_dependencies = context.rpm_python_dependencies();
        assert_eq!(rpm_dependencies, vec!["libewf-python3", "python3-pyyaml"]);
        assert_eq!(
            context.rpm_test_dependencies(&rpm_dependencies),
            vec!["python3-mock", "python3-setuptools"]
        );
    }

    #[test]
    fn test_dpkg_dev_dependencies() {
        let mut xattr = dependency("xattr", None);
        xattr.dpkg_name = Some("python3-xattr".to_string());
        let mut yara = dependency("yara", None);
        yara.dpkg_name = Some("python3-yara".to_string());
        let helper = DependencyHelper::new(vec![xattr, yara], vec![]);
        let project = project("plaso");
        let context = WriterContext::new("data", &project, &helper);

        assert_eq!(context.dpkg_dev_dependencies(), vec!["libssl-dev", "libffi-dev"]);
    }

    #[test]
    fn test_join_unique() {
        let dependencies = ["python3", "python3-mock", "python3"].map(str::to_string);
        assert_eq!(join_unique(dependencies), "python3 python3-mock");
    }
}
