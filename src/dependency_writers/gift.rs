//! Writers of the installation scripts that set up a project's dependencies
//! from the GIFT COPR (Fedora) and GIFT PPA (Ubuntu) repositories.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{DependencyFileWriter, WriterContext};

const COPR_INSTALL_TEMPLATE: &str = r#"#!/usr/bin/env bash
#
# Script to set up tests on Fedora with the GIFT copr.
#
# This file is generated by l2tdevtools update-dependencies, any dependency
# related changes should be made in dependencies.ini.

# Exit on error.
set -e

# Dependencies for running $project_name, alphabetized, one per line.
# This should not include packages only required for testing or development.
$python_dependencies

# Additional dependencies for running tests, alphabetized, one per line.
$test_dependencies

# Additional dependencies for development, alphabetized, one per line.
$development_dependencies

# Additional dependencies for debugging, alphabetized, one per line.
$debug_dependencies

sudo dnf install -y dnf-plugins-core
sudo dnf copr -y enable @gift/testing
sudo dnf install -y $${PYTHON3_DEPENDENCIES}

if [[ "$$*" =~ "include-debug" ]]; then
    sudo dnf install -y $${DEBUG_DEPENDENCIES}
fi

if [[ "$$*" =~ "include-development" ]]; then
    sudo dnf install -y $${DEVELOPMENT_DEPENDENCIES}
fi

if [[ "$$*" =~ "include-test" ]]; then
    sudo dnf install -y $${TEST_DEPENDENCIES}
fi
"#;

const PPA_HEADER_TEMPLATE: &str = r#"#!/usr/bin/env bash
#
# This file is generated by l2tdevtools update-dependencies.py any dependency
# related changes should be made in dependencies.ini.

# Exit on error.
set -e

# Dependencies for running $project_name, alphabetized, one per line.
# This should not include packages only required for testing or development.
$python_dependencies

# Additional dependencies for running $project_name tests, alphabetized,
# one per line.
TEST_DEPENDENCIES="python-mock";

# Additional dependencies for doing $project_name development, alphabetized,
# one per line.
DEVELOPMENT_DEPENDENCIES="python-sphinx
                          pylint";
"#;

const PPA_DEBUG_DEPENDENCIES_TEMPLATE: &str = "
# Additional dependencies for doing $project_name debugging, alphabetized,
# one per line.
$debug_dependencies
";

const PPA_FOOTER_TEMPLATE: &str = "
sudo add-apt-repository ppa:gift/dev -y
sudo apt-get update -q
sudo apt-get install -y $${PYTHON3_DEPENDENCIES}
";

const PPA_FOOTER_DEBUG_TEMPLATE: &str = r#"
if [[ "$$*" =~ "include-debug" ]]; then
    sudo apt-get install -y $${DEBUG_DEPENDENCIES}
fi
"#;

const PPA_FOOTER_DEVELOPMENT_AND_TEST_TEMPLATE: &str = r#"
if [[ "$$*" =~ "include-development" ]]; then
    sudo apt-get install -y $${DEVELOPMENT_DEPENDENCIES}
fi

if [[ "$$*" =~ "include-test" ]]; then
    sudo apt-get install -y $${TEST_DEPENDENCIES}
fi
"#;

/// Format a shell variable assignment with one package per line, aligned
/// after the opening quote.
fn shell_variable(name: &str, packages: &[String]) -> String {
    let indent = " ".repeat(name.len() + 2);

    let mut lines = Vec::with_capacity(packages.len());
    for (index, package) in packages.iter().enumerate() {
        let mut line = if index == 0 {
            format!("{}=\"{}", name, package)
        } else {
            format!("{}{}", indent, package)
        };
        if index + 1 == packages.len() {
            line.push_str("\";");
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Prefix of a libyal Python binding package name, such as `libewf` for
/// `libewf-python3`.
fn libyal_prefix<'d>(package: &'d str, suffixes: &[&str]) -> Option<&'d str> {
    if !package.starts_with("lib") || !suffixes.iter().any(|suffix| package.ends_with(suffix)) {
        return None;
    }
    package.split('-').next()
}

/// Writes `config/linux/gift_copr_install.sh`.
#[derive(Debug)]
pub struct GiftCoprInstallScriptWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> GiftCoprInstallScriptWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        GiftCoprInstallScriptWriter { context }
    }

    fn debug_dependencies(python_dependencies: &[String]) -> Vec<String> {
        let mut debug_dependencies = Vec::new();
        for dependency in python_dependencies {
            if let Some(prefix) = libyal_prefix(dependency, &["python", "python2", "python3"]) {
                debug_dependencies.push(format!("{}-debuginfo", prefix));
                debug_dependencies.push(format!("{}-debuginfo", dependency));
            }
        }
        debug_dependencies.sort();
        debug_dependencies
    }
}

impl DependencyFileWriter for GiftCoprInstallScriptWriter<'_> {
    fn path(&self) -> &'static str {
        "config/linux/gift_copr_install.sh"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let project_name = self.context.project().name.as_str();

        let mut python_dependencies = self.context.rpm_python_dependencies();
        python_dependencies.sort();
        let test_dependencies = self.context.rpm_test_dependencies(&python_dependencies);

        let mut development_dependencies = vec!["pylint".to_string()];
        if project_name == "plaso" {
            development_dependencies.push("python-sphinx".to_string());
        }
        development_dependencies.sort();

        let debug_dependencies = Self::debug_dependencies(&python_dependencies);

        let python_dependencies = shell_variable("PYTHON3_DEPENDENCIES", &python_dependencies);
        let test_dependencies = shell_variable("TEST_DEPENDENCIES", &test_dependencies);
        let development_dependencies = shell_variable("DEVELOPMENT_DEPENDENCIES", &development_dependencies);
        let debug_dependencies = shell_variable("DEBUG_DEPENDENCIES", &debug_dependencies);

        self.context.generate_from_template(
            "gift_copr_install.sh",
            COPR_INSTALL_TEMPLATE,
            &[
                ("debug_dependencies", &debug_dependencies),
                ("development_dependencies", &development_dependencies),
                ("project_name", project_name),
                ("python_dependencies", &python_dependencies),
                ("test_dependencies", &test_dependencies),
            ],
        )
    }
}

/// Writes `config/linux/gift_ppa_install_py3.sh`.
#[derive(Debug)]
pub struct GiftPpaInstallScriptWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> GiftPpaInstallScriptWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        GiftPpaInstallScriptWriter { context }
    }

    fn debug_dependencies(python_dependencies: &[String]) -> Vec<String> {
        let mut debug_dependencies = Vec::new();
        for dependency in python_dependencies {
            if let Some(prefix) = libyal_prefix(dependency, &["python3"]) {
                debug_dependencies.push(format!("{}-dbg", prefix));
                debug_dependencies.push(format!("{}-python3-dbg", prefix));
            }
        }
        debug_dependencies
    }
}

impl DependencyFileWriter for GiftPpaInstallScriptWriter<'_> {
    fn path(&self) -> &'static str {
        "config/linux/gift_ppa_install_py3.sh"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let project_name = self.context.project().name.as_str();

        let python_dependencies = self.context.dpkg_python_dependencies();
        let debug_dependencies = Self::debug_dependencies(&python_dependencies);

        let formatted_python_dependencies = shell_variable("PYTHON3_DEPENDENCIES", &python_dependencies);
        let formatted_debug_dependencies = shell_variable("DEBUG_DEPENDENCIES", &debug_dependencies);
        let mappings = [
            ("debug_dependencies", formatted_debug_dependencies.as_str()),
            ("project_name", project_name),
            ("python_dependencies", formatted_python_dependencies.as_str()),
        ];

        let mut content = self.context.generate_from_template(
            "gift_ppa_install_py3.sh/header",
            PPA_HEADER_TEMPLATE,
            &mappings,
        )?;
        if !debug_dependencies.is_empty() {
            content.push_str(&self.context.generate_from_template(
                "gift_ppa_install_py3.sh/debug_dependencies",
                PPA_DEBUG_DEPENDENCIES_TEMPLATE,
                &mappings,
            )?);
        }
        content.push_str(&self.context.generate_from_template(
            "gift_ppa_install_py3.sh/footer",
            PPA_FOOTER_TEMPLATE,
            &mappings,
        )?);
        if !debug_dependencies.is_empty() {
            content.push_str(&self.context.generate_from_template(
                "gift_ppa_install_py3.sh/footer_debug",
                PPA_FOOTER_DEBUG_TEMPLATE,
                &mappings,
            )?);
        }
        content.push_str(&self.context.generate_from_template(
            "gift_ppa_install_py3.sh/footer_development_and_test",
            PPA_FOOTER_DEVELOPMENT_AND_TEST_TEMPLATE,
            &mappings,
        )?);

        Ok(content)
    }
}
