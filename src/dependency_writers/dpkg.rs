//! Writers of the Debian packaging files in `config/dpkg/`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{DependencyFileWriter, WriterContext};

const COMPAT_TEMPLATE: &str = "9\n";

const CONTROL_HEADER_TEMPLATE: &str = "\
Source: $project_name
Section: python
Priority: extra
Maintainer: $maintainer
Build-Depends: debhelper (>= 9), dh-python, $build_dependencies
Standards-Version: 4.1.4
X-Python3-Version: >= 3.6
Homepage: $homepage_url
";

const CONTROL_DATA_PACKAGE_TEMPLATE: &str = "\
Package: $project_name-data
Architecture: all
Depends: $${misc:Depends}
Description: Data files for $name_description
$description_long
";

const CONTROL_PYTHON3_PACKAGE_TEMPLATE: &str = "\
Package: python3-$project_name
Architecture: all
Depends: ${python3_dependencies}$${misc:Depends}
Description: Python 3 module of $name_description
$description_long
";

const CONTROL_TOOLS_PACKAGE_TEMPLATE: &str = "\
Package: $project_name-tools
Architecture: all
Depends: python3-$project_name (>= $${binary:Version}), $${misc:Depends}
Description: Tools of $name_description
$description_long
";

const RULES_TEMPLATE: &str = "\
#!/usr/bin/make -f

%:
\tdh $$@ --buildsystem=pybuild --with=python3

.PHONY: override_dh_auto_test
override_dh_auto_test:

";

/// Writes `config/dpkg/compat`.
#[derive(Debug)]
pub struct DpkgCompatWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> DpkgCompatWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        DpkgCompatWriter { context }
    }
}

impl DependencyFileWriter for DpkgCompatWriter<'_> {
    fn path(&self) -> &'static str {
        "config/dpkg/compat"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        self.context.generate_from_template("dpkg/compat", COMPAT_TEMPLATE, &[])
    }
}

/// Writes `config/dpkg/control` with a Python 3 module package, and data
/// and tools packages when the project has them.
#[derive(Debug)]
pub struct DpkgControlWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> DpkgControlWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        DpkgControlWriter { context }
    }

    fn build_dependencies(&self) -> String {
        let mut build_dependencies = vec!["python3-all (>= 3.6~)", "python3-setuptools"];
        if self.context.project().name == "timesketch" {
            build_dependencies.insert(0, "dh-systemd (>= 1.5)");
            build_dependencies.push("python3-pip");
        }
        build_dependencies.join(", ")
    }
}

impl DependencyFileWriter for DpkgControlWriter<'_> {
    fn path(&self) -> &'static str {
        "config/dpkg/control"
    }

    fn generate(&self, project_path: &Path) -> Result<String> {
        let project = self.context.project();
        let has_data = project_path.join("data").is_dir();
        let has_tools = project_path.join("scripts").is_dir()
            || project_path.join("tools").is_dir()
            || project.name == "timesketch";

        let mut python3_dependencies = self.context.dependency_helper().dpkg_depends(false, false);
        if has_data {
            python3_dependencies.insert(0, format!("{}-data (>= ${{binary:Version}})", project.name));
        }
        // Followed by ${misc:Depends} in the template.
        let python3_dependencies: String = python3_dependencies
            .iter()
            .map(|dependency| format!("{}, ", dependency))
            .collect();

        // Continuation lines of a control field, with blank lines as ".".
        let description_long = project
            .description_long
            .lines()
            .map(|line| if line.is_empty() { " .".to_string() } else { format!(" {}", line) })
            .collect::<Vec<_>>()
            .join("\n");

        let build_dependencies = self.build_dependencies();
        let mappings = [
            ("build_dependencies", build_dependencies.as_str()),
            ("description_long", description_long.as_str()),
            ("homepage_url", project.homepage_url.as_str()),
            ("maintainer", project.maintainer.as_str()),
            ("name_description", project.name_description.as_str()),
            ("project_name", project.name.as_str()),
            ("python3_dependencies", python3_dependencies.as_str()),
        ];

        let mut stanzas = vec![self.context.generate_from_template(
            "dpkg/control_header",
            CONTROL_HEADER_TEMPLATE,
            &mappings,
        )?];
        if has_data {
            stanzas.push(self.context.generate_from_template(
                "dpkg/control_data",
                CONTROL_DATA_PACKAGE_TEMPLATE,
                &mappings,
            )?);
        }
        stanzas.push(self.context.generate_from_template(
            "dpkg/control_python3",
            CONTROL_PYTHON3_PACKAGE_TEMPLATE,
            &mappings,
        )?);
        if has_tools {
            stanzas.push(self.context.generate_from_template(
                "dpkg/control_tools",
                CONTROL_TOOLS_PACKAGE_TEMPLATE,
                &mappings,
            )?);
        }

        Ok(stanzas.join("\n"))
    }
}

/// Writes `config/dpkg/rules` building with pybuild.
#[derive(Debug)]
pub struct DpkgRulesWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> DpkgRulesWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        DpkgRulesWriter { context }
    }
}

impl DependencyFileWriter for DpkgRulesWriter<'_> {
    fn path(&self) -> &'static str {
        "config/dpkg/rules"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let project_name = self.context.project().name.as_str();
        self.context
            .generate_from_template("dpkg/rules", RULES_TEMPLATE, &[("project_name", project_name)])
    }
}
