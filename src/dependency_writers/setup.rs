//! Writers of the Python packaging files: `setup.cfg`, `setup.py` and
//! `pyproject.toml`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{DependencyFileWriter, WriterContext};
use crate::util::fs::glob_files;

const DOC_FILES: &[&str] = &["ACKNOWLEDGEMENTS", "AUTHORS", "LICENSE", "README"];

const PROJECTS_WITH_SDIST_TEST_DATA: &[&str] = &[
    "dfimagetools",
    "dfvfs",
    "dfwinreg",
    "plaso",
    "winevt-kb",
    "winreg-kb",
    "winsps-kb",
];

const METADATA_TEMPLATE: &str = "\
[metadata]
name = $project_name
version = $version
description = $description_short
long_description = $description_long
long_description_content_type = text/plain
url = $homepage_url
maintainer = $maintainer_name
maintainer_email = $maintainer_email
license = Apache License, Version 2.0
license_files =
  ACKNOWLEDGEMENTS
  AUTHORS
  LICENSE
  README
classifiers =
  $development_status
  Programming Language :: Python

[options]
install_requires = file:requirements.txt
package_dir =
  $python_module_name = $python_module_name
packages = find:
python_requires = >=3.8
";

const OPTIONS_SCRIPTS_TEMPLATE: &str = "\
scripts =
$scripts
";

const OPTIONS_PACKAGE_DATA_TEMPLATE: &str = "
[options.package_data]
$python_module_name =
$package_data
";

const OPTIONS_PACKAGES_FIND_TEMPLATE: &str = "
[options.packages.find]
exclude =
  docs
  tests
  tests.*
  utils
where = .
";

const SDIST_TEST_DATA_TEMPLATE: &str = "
[sdist_test_data]
template = MANIFEST.test_data.in
manifest = MANIFEST.test_data
";

const BDIST_RPM_TEMPLATE: &str = "
[bdist_rpm]
release = 1
packager = $maintainer
doc_files =
$doc_files
build_requires = python3-setuptools
requires =
$requires
";

const BDIST_WHEEL_TEMPLATE: &str = "
[bdist_wheel]
universal = 1
";

const SETUP_PY_TEMPLATE: &str = r#"#!/usr/bin/env python3
# -*- coding: utf-8 -*-
"""Installation and deployment script."""

from setuptools import setup


setup()
"#;

const PYPROJECT_TOML_TEMPLATE: &str = r#"[build-system]
requires = ["setuptools", "wheel"]
build-backend = "setuptools.build_meta"
"#;

/// Indent each value for a multi-line setup.cfg option.
fn indented(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("  {}", value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes `setup.cfg`.
#[derive(Debug)]
pub struct SetupCfgWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> SetupCfgWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        SetupCfgWriter { context }
    }

    /// Package data globs, one per directory of the Python module holding
    /// `.yaml` files.
    fn package_data(module_path: &Path) -> Result<Vec<String>> {
        if !module_path.is_dir() {
            return Ok(Vec::new());
        }

        let mut package_data = Vec::new();
        for path in glob_files(module_path, &["**/*.yaml".to_string()])? {
            let directory = path
                .parent()
                .and_then(|parent| parent.strip_prefix(module_path).ok())
                .map(|relative| {
                    relative
                        .components()
                        .map(|component| component.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_default();

            let data_file = if directory.is_empty() {
                "*.yaml".to_string()
            } else {
                format!("{}/*.yaml", directory)
            };
            if !package_data.contains(&data_file) {
                package_data.push(data_file);
            }
        }

        package_data.sort();
        Ok(package_data)
    }

    /// Scripts in `scripts/`, or else in `tools/`.
    fn scripts(project_path: &Path) -> Result<Vec<String>> {
        let Some(directory) = ["scripts", "tools"]
            .into_iter()
            .find(|directory| project_path.join(directory).is_dir())
        else {
            return Ok(Vec::new());
        };

        let mut scripts: Vec<String> = glob_files(&project_path.join(directory), &["[a-z]*.py".to_string()])?
            .iter()
            .filter_map(|path| path.file_name())
            .map(|file_name| format!("{}/{}", directory, file_name.to_string_lossy()))
            .collect();

        scripts.sort();
        Ok(scripts)
    }
}

impl DependencyFileWriter for SetupCfgWriter<'_> {
    fn path(&self) -> &'static str {
        "setup.cfg"
    }

    fn generate(&self, project_path: &Path) -> Result<String> {
        let project = self.context.project();
        let python_module_name = project.python_module_name();

        let description_long = project.description_long.lines().collect::<Vec<_>>().join(" ");
        let (maintainer_name, maintainer_email) = project.maintainer_name_and_email();

        let doc_files: Vec<String> = DOC_FILES
            .iter()
            .filter(|doc_file| project_path.join(doc_file).is_file())
            .map(|doc_file| doc_file.to_string())
            .collect();
        let requires = self.context.dependency_helper().rpm_requires(false, false);
        let package_data = Self::package_data(&project_path.join(&python_module_name))?;
        let scripts = Self::scripts(project_path)?;
        let version = chrono::Local::now().format("%Y%m%d").to_string();

        let formatted_doc_files = indented(&doc_files);
        let formatted_package_data = indented(&package_data);
        let formatted_requires = indented(&requires);
        let formatted_scripts = indented(&scripts);
        let mappings = [
            ("description_long", description_long.as_str()),
            ("description_short", project.description_short.as_str()),
            ("development_status", project.development_status()),
            ("doc_files", formatted_doc_files.as_str()),
            ("homepage_url", project.homepage_url.as_str()),
            ("maintainer", project.maintainer.as_str()),
            ("maintainer_email", maintainer_email),
            ("maintainer_name", maintainer_name),
            ("package_data", formatted_package_data.as_str()),
            ("project_name", project.name.as_str()),
            ("python_module_name", python_module_name.as_str()),
            ("requires", formatted_requires.as_str()),
            ("scripts", formatted_scripts.as_str()),
            ("version", version.as_str()),
        ];

        let mut sections = vec![("metadata", METADATA_TEMPLATE)];
        if !scripts.is_empty() {
            sections.push(("options_scripts", OPTIONS_SCRIPTS_TEMPLATE));
        }
        if !package_data.is_empty() {
            sections.push(("options_package_data", OPTIONS_PACKAGE_DATA_TEMPLATE));
        }
        sections.push(("options_packages_find", OPTIONS_PACKAGES_FIND_TEMPLATE));
        if PROJECTS_WITH_SDIST_TEST_DATA.contains(&project.name.as_str()) {
            sections.push(("sdist_test_data", SDIST_TEST_DATA_TEMPLATE));
        }
        sections.push(("bdist_rpm", BDIST_RPM_TEMPLATE));
        sections.push(("bdist_wheel", BDIST_WHEEL_TEMPLATE));

        let mut content = String::new();
        for (name, template) in sections {
            content.push_str(&self.context.generate_from_template(
                &format!("setup.cfg/{}", name),
                template,
                &mappings,
            )?);
        }
        Ok(content)
    }
}

/// Writes `setup.py` from its template, as is.
#[derive(Debug)]
pub struct SetupPyWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> SetupPyWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        SetupPyWriter { context }
    }
}

impl DependencyFileWriter for SetupPyWriter<'_> {
    fn path(&self) -> &'static str {
        "setup.py"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        self.context.read_template("setup.py", SETUP_PY_TEMPLATE)
    }
}

/// Writes `pyproject.toml` from its template, as is.
#[derive(Debug)]
pub struct PyprojectTomlWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> PyprojectTomlWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        PyprojectTomlWriter { context }
    }
}

impl DependencyFileWriter for PyprojectTomlWriter<'_> {
    fn path(&self) -> &'static str {
        "pyproject.toml"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        self.context.read_template("pyproject.toml", PYPROJECT_TOML_TEMPLATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency_writers::tests::{helper, project};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_cfg_writer() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("AUTHORS"), "").unwrap();
        fs::write(tmp.path().join("LICENSE"), "").unwrap();
        let helper = helper();
        let mut project = project("dfdatetime");
        project.status = "stable".to_string();

        let writer = SetupCfgWriter::new(WriterContext::new(tmp.path().join("data"), &project, &helper));
        writer.write(tmp.path()).unwrap();

        let content = fs::read_to_string(tmp.path().join("setup.cfg")).unwrap();
        let version = chrono::Local::now().format("%Y%m%d").to_string();

        assert!(content.starts_with(&format!("[metadata]\nname = dfdatetime\nversion = {}\n", version)));
        assert!(content.contains(
            "\nlong_description = Digital Forensics Virtual File System read-only access\n"
        ));
        assert!(content.contains("\nmaintainer = Log2Timeline maintainers\n"));
        assert!(content.contains("\nmaintainer_email = log2timeline-maintainers@googlegroups.com\n"));
        assert!(content.contains("\n  Development Status :: 5 - Production/Stable\n"));
        assert!(content.contains(
            "\n[bdist_rpm]\nrelease = 1\npackager = Log2Timeline maintainers <log2timeline-maintainers@googlegroups.com>\ndoc_files =\n  AUTHORS\n  LICENSE\nbuild_requires = python3-setuptools\nrequires =\n  libewf-python3 >= 20131210\n  python3-pyyaml >= 3.10\n"
        ));
        assert!(content.ends_with("\n[bdist_wheel]\nuniversal = 1\n"));
        assert!(!content.contains("scripts ="));
        assert!(!content.contains("[options.package_data]"));
        assert!(!content.contains("[sdist_test_data]"));
    }

    #[test]
    fn test_setup_cfg_writer_with_scripts_and_package_data() {
        let tmp = TempDir::new().unwrap();
        let scripts = tmp.path().join("tools");
        fs::create_dir(&scripts).unwrap();
        fs::write(scripts.join("pinfo.py"), "").unwrap();
        fs::write(scripts.join("Helper.py"), "").unwrap();
        fs::write(scripts.join("__init__.py"), "").unwrap();
        let module = tmp.path().join("plaso");
        fs::create_dir_all(module.join("parsers").join("plugins")).unwrap();
        fs::write(module.join("parsers").join("formats.yaml"), "").unwrap();
        fs::write(module.join("parsers").join("plugins").join("a.yaml"), "").unwrap();
        fs::write(module.join("parsers").join("plugins").join("b.yaml"), "").unwrap();
        let helper = helper();
        let project = project("plaso");

        let writer = SetupCfgWriter::new(WriterContext::new(tmp.path().join("data"), &project, &helper));
        let content = writer.generate(tmp.path()).unwrap();

        assert!(content.contains("\npython_requires = >=3.8\nscripts =\n  tools/pinfo.py\n"));
        assert!(content.contains(
            "\n[options.package_data]\nplaso =\n  parsers/*.yaml\n  parsers/plugins/*.yaml\n"
        ));
        assert!(content.contains("\n[sdist_test_data]\n"));
    }

    #[test]
    fn test_setup_py_writer() {
        let tmp = TempDir::new().unwrap();
        let helper = helper();
        let project = project("dfvfs");

        let writer = SetupPyWriter::new(WriterContext::new(tmp.path().join("data"), &project, &helper));
        assert!(writer.generate(tmp.path()).unwrap().ends_with("\nsetup()\n"));

        let templates = tmp.path().join("data").join("templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("setup.py"), "import os\nos.environ['$HOME']\n").unwrap();
        assert_eq!(writer.generate(tmp.path()).unwrap(), "import os\nos.environ['$HOME']\n");
    }

    #[test]
    fn test_pyproject_toml_writer() {
        let tmp = TempDir::new().unwrap();
        let helper = helper();
        let project = project("dfvfs");

        let writer = PyprojectTomlWriter::new(WriterContext::new(tmp.path().join("data"), &project, &helper));
        writer.write(tmp.path()).unwrap();

        let content = fs::read_to_string(tmp.path().join("pyproject.toml")).unwrap();
        assert!(content.contains("build-backend = \"setuptools.build_meta\"\n"));
    }
}
