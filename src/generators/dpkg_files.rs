//! Generation of the `debian/` packaging files.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::{BuildSystem, ProjectDefinition};
use crate::util::fs::{copy_file, ensure_dir, read_to_string, set_executable, write_string};
use crate::util::template::format_slots;

const EMAIL_ADDRESS: &str = "log2timeline development team <log2timeline-dev@googlegroups.com>";

/// Distribution written into generated changelogs.
pub const DEFAULT_CHANGELOG_DISTRIBUTION: &str = "unstable";

const CHANGELOG_TEMPLATE: &str = "\
{source_package_name} ({project_version}-1) {distribution}; urgency=low

  * Auto-generated

 -- {maintainer_email_address}  {date_time}
";

const CLEAN_TEMPLATE_PYTHON: &str = "{setup_name}/*.pyc\n*.pyc\n";

const COMPAT_TEMPLATE: &str = "10\n";

const CONTROL_TEMPLATE_CONFIGURE_MAKE: &str = "\
Source: {source_package_name}
Section: libs
Priority: extra
Maintainer: {upstream_maintainer}
Build-Depends: debhelper (>= 9){build_depends}
Standards-Version: 4.1.4
Homepage: {upstream_homepage}

Package: {package_name}
Architecture: {architecture}
Depends: {depends}
Description: {description_short}
 {description_long}
";

const CONTROL_TEMPLATE_PYTHON3: &str = "\
Source: {source_package_name}
Section: python
Priority: extra
Maintainer: {upstream_maintainer}
Build-Depends: debhelper (>= 9){build_depends}
Standards-Version: 4.1.4
X-Python3-Version: >= 3.6
Homepage: {upstream_homepage}

Package: {python3_package_name}
Architecture: {architecture}
Depends: {python3_depends}
Description: {description_short}
 {description_long}
";

const CONTROL_TEMPLATE_TOOLS: &str = "
Package: {source_package_name}-tools
Architecture: all
Depends: {python3_package_name} (>= ${{binary:Version}}), python3 (>= 3.6~), ${{python3:Depends}}, ${{misc:Depends}}
Description: Tools of {description_name}
 {description_long}
";

const INSTALL_TEMPLATE_PYTHON3: &str = "\
usr/lib/python3*/dist-packages/{package_name}/
usr/lib/python3*/dist-packages/{package_name}*.egg-info/*
";

const INSTALL_TEMPLATE_TOOLS: &str = "usr/bin\n";

const RULES_TEMPLATE_CONFIGURE_MAKE: &str = "\
#!/usr/bin/make -f

# Uncomment this to turn on verbose mode.
# export DH_VERBOSE=1

# This has to be exported to make some magic below work.
export DH_OPTIONS

%:
\tdh  $@ {build_system}

.PHONY: override_dh_auto_configure
override_dh_auto_configure:
\tdh_auto_configure -- {configure_options} CFLAGS=\"-g\"

.PHONY: override_dh_auto_test
override_dh_auto_test:

.PHONY: override_dh_install
override_dh_install:
\t# Create the {package_name} package.
\tdh_install

.PHONY: override_dh_strip
override_dh_strip:
ifeq (,$(filter nostrip,$(DEB_BUILD_OPTIONS)))
        dh_strip -p{package_name} --dbg-package={package_name}-dbg
endif

.PHONY: override_dh_shlibdeps
override_dh_shlibdeps:
\tdh_shlibdeps -L{package_name} -l${{CURDIR}}/debian/tmp/usr/lib
";

const RULES_TEMPLATE_PYTHON: &str = "\
#!/usr/bin/make -f

%:
\tdh $@ --buildsystem=pybuild --with=python3

.PHONY: override_dh_auto_test
override_dh_auto_test:

";

const SOURCE_FORMAT_TEMPLATE: &str = "3.0 (quilt)\n";

const SOURCE_OPTIONS_TEMPLATE: &str = "extend-diff-ignore = \"(^|/)(\\.eggs|config\\.h|config\\.log|config\\.status|.*\\.egg-info|.*\\.egg-info/.*|.*\\.pxd|.*\\.pyx|Makefile|CMakeCache.txt|CMakeFiles.*)$\"\n";

/// Packages that never get a tools package.
const PACKAGES_WITHOUT_TOOLS: &[&str] = &["idna", "mock", "psutil"];

/// Facts about an installed Python project, used to shape the packaging
/// files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DpkgBuildConfiguration {
    pub has_bin_directory: bool,
    pub has_egg_info_directory: bool,
    pub has_egg_info_file: bool,
    pub has_module_source_files: bool,
    pub has_module_shared_object: bool,
    pub module_directories: Vec<String>,
}

/// Rewrite `python-`, `python2-` and `python3-` package names to
/// `python3-`. Other names are returned as `None`.
fn python3_dependency(dependency: &str) -> Option<String> {
    if let Some(name) = dependency.strip_prefix("python-") {
        return Some(format!("python3-{}", name));
    }
    dependency
        .strip_prefix("python2-")
        .or_else(|| dependency.strip_prefix("python3-"))
        .map(|name| format!("python3-{}", name))
}

/// Generates the files of a `debian/` packaging directory.
#[derive(Debug)]
pub struct DpkgBuildFilesGenerator<'a> {
    definition: &'a ProjectDefinition,
    project_version: &'a str,
    data_path: &'a Path,
    build_configuration: Option<&'a DpkgBuildConfiguration>,
    distribution: String,
}

impl<'a> DpkgBuildFilesGenerator<'a> {
    pub fn new(definition: &'a ProjectDefinition, project_version: &'a str, data_path: &'a Path) -> Self {
        DpkgBuildFilesGenerator {
            definition,
            project_version,
            data_path,
            build_configuration: None,
            distribution: DEFAULT_CHANGELOG_DISTRIBUTION.to_string(),
        }
    }

    /// Use the facts determined from an installed project.
    pub fn with_build_configuration(mut self, configuration: Option<&'a DpkgBuildConfiguration>) -> Self {
        self.build_configuration = configuration;
        self
    }

    /// Set the distribution written into the changelog.
    pub fn with_distribution(mut self, distribution: impl Into<String>) -> Self {
        self.distribution = distribution.into();
        self
    }

    /// Generate the packaging files into `dpkg_path`, which must not exist.
    pub fn generate_files(&self, dpkg_path: &Path) -> Result<()> {
        std::fs::create_dir(dpkg_path)
            .with_context(|| format!("failed to create directory: {}", dpkg_path.display()))?;

        self.generate_changelog_file(dpkg_path)?;
        self.generate_clean_file(dpkg_path)?;
        write_string(&dpkg_path.join("compat"), COMPAT_TEMPLATE)?;
        self.generate_control_file(dpkg_path)?;
        self.generate_copyright_file(dpkg_path)?;
        self.generate_install_files(dpkg_path)?;
        self.generate_rules_file(dpkg_path)?;

        for filename in &self.definition.dpkg_template_additional {
            self.generate_file(Some(filename), "", &[], &dpkg_path.join(filename))?;
        }

        ensure_dir(&dpkg_path.join("source"))?;
        if let Some(template) = &self.definition.dpkg_template_py3dist_overrides {
            self.generate_file(Some(template), "", &[], &dpkg_path.join("py3dist-overrides"))?;
        }
        write_string(&dpkg_path.join("source").join("format"), SOURCE_FORMAT_TEMPLATE)?;
        self.generate_file(
            self.definition.dpkg_template_source_options.as_deref(),
            SOURCE_OPTIONS_TEMPLATE,
            &[],
            &dpkg_path.join("source").join("options"),
        )?;

        Ok(())
    }

    /// Write a file from a named template in `dpkg_templates/` or from the
    /// built-in template. Slots are only filled in when values are given.
    fn generate_file(
        &self,
        template_filename: Option<&str>,
        template: &str,
        values: &[(&str, &str)],
        output_path: &Path,
    ) -> Result<()> {
        let template = match template_filename {
            Some(filename) => read_to_string(&self.data_path.join("dpkg_templates").join(filename))?,
            None => template.to_string(),
        };

        let data = if values.is_empty() {
            template
        } else {
            format_slots(&template, values)
                .with_context(|| format!("invalid template for: {}", output_path.display()))?
        };
        write_string(output_path, &data)
    }

    fn is_configure_make(&self) -> bool {
        matches!(self.definition.build_system, Some(BuildSystem::ConfigureMake))
    }

    fn is_python(&self) -> bool {
        self.definition
            .build_system
            .as_ref()
            .is_some_and(BuildSystem::is_python)
    }

    fn has_bin_directory(&self) -> bool {
        self.build_configuration
            .is_some_and(|configuration| configuration.has_bin_directory)
    }

    /// Package name without a `python-`, `python2-` or `python3-` prefix.
    fn package_name(&self) -> &str {
        let name = self.definition.dpkg_name.as_deref().unwrap_or(&self.definition.name);
        name.strip_prefix("python-")
            .or_else(|| name.strip_prefix("python2-"))
            .or_else(|| name.strip_prefix("python3-"))
            .unwrap_or(name)
    }

    fn python3_package_name(&self) -> String {
        format!("python3-{}", self.package_name())
    }

    fn generate_changelog_file(&self, dpkg_path: &Path) -> Result<()> {
        let date_time = chrono::Local::now().format("%a, %d %b %Y %H:%M:%S %z").to_string();

        self.generate_file(
            None,
            CHANGELOG_TEMPLATE,
            &[
                ("date_time", &date_time),
                ("distribution", &self.distribution),
                ("maintainer_email_address", EMAIL_ADDRESS),
                ("project_version", self.project_version),
                ("source_package_name", self.definition.dpkg_source_name()),
            ],
            &dpkg_path.join("changelog"),
        )
    }

    fn generate_clean_file(&self, dpkg_path: &Path) -> Result<()> {
        if !self.is_python() {
            return Ok(());
        }
        self.generate_file(
            None,
            CLEAN_TEMPLATE_PYTHON,
            &[("setup_name", self.definition.setup_name())],
            &dpkg_path.join("clean"),
        )
    }

    fn generate_control_file(&self, dpkg_path: &Path) -> Result<()> {
        let definition = self.definition;
        let package_name = self.package_name();
        let python3_package_name = self.python3_package_name();
        let architecture = if definition.architecture_dependent { "any" } else { "all" };

        let mut build_depends: Vec<String> = Vec::new();
        let mut python3_build_depends: Vec<String> = Vec::new();

        if self.is_configure_make() {
            build_depends.push("autotools-dev".to_string());
        } else if self.is_python() {
            build_depends.push("dh-python".to_string());
            if !matches!(definition.build_system, Some(BuildSystem::SetupPy)) {
                build_depends.push("pybuild-plugin-pyproject".to_string());
            }
            python3_build_depends.push("python3-all (>= 3.6~)".to_string());
            python3_build_depends.push("python3-setuptools".to_string());
            if definition.architecture_dependent {
                python3_build_depends.push("python3-all-dev".to_string());
            }
        }

        for dependency in &definition.dpkg_build_dependencies {
            match python3_dependency(dependency) {
                Some(dependency) if self.is_python() => python3_build_depends.push(dependency),
                _ => build_depends.push(dependency.clone()),
            }
        }
        if self.is_python() {
            build_depends.extend(python3_build_depends);
        }

        let build_depends = if build_depends.is_empty() {
            String::new()
        } else {
            format!(", {}", build_depends.join(", "))
        };

        let mut depends: Vec<String> = Vec::new();
        let mut python3_depends: Vec<String> = Vec::new();
        for dependency in &definition.dpkg_dependencies {
            match python3_dependency(dependency) {
                Some(dependency) => python3_depends.push(dependency),
                None => depends.push(dependency.clone()),
            }
        }
        depends.extend(["${shlibs:Depends}".to_string(), "${misc:Depends}".to_string()]);
        python3_depends.extend(["${python3:Depends}".to_string(), "${misc:Depends}".to_string()]);

        let description_short = definition
            .description_short
            .as_deref()
            .unwrap_or_default()
            .replace('\n', " ");
        let description_long = definition
            .description_long
            .as_deref()
            .unwrap_or_default()
            .replace('\n', "\n ");

        let mut template = String::new();
        if self.is_configure_make() {
            template.push_str(CONTROL_TEMPLATE_CONFIGURE_MAKE);
        } else if self.is_python() {
            template.push_str(CONTROL_TEMPLATE_PYTHON3);
            if !PACKAGES_WITHOUT_TOOLS.contains(&package_name) && self.has_bin_directory() {
                template.push_str(CONTROL_TEMPLATE_TOOLS);
            }
        }

        let depends = depends.join(", ");
        let python3_depends = python3_depends.join(", ");
        self.generate_file(
            definition.dpkg_template_control.as_deref(),
            &template,
            &[
                ("architecture", architecture),
                ("build_depends", &build_depends),
                ("depends", &depends),
                ("description_long", &description_long),
                ("description_name", &definition.name),
                ("description_short", &description_short),
                ("package_name", package_name),
                ("python3_depends", &python3_depends),
                ("python3_package_name", &python3_package_name),
                ("source_package_name", definition.dpkg_source_name()),
                ("upstream_homepage", definition.homepage_url.as_deref().unwrap_or_default()),
                ("upstream_maintainer", definition.maintainer.as_deref().unwrap_or_default()),
            ],
            &dpkg_path.join("control"),
        )
    }

    fn generate_copyright_file(&self, dpkg_path: &Path) -> Result<()> {
        let license_path = self
            .data_path
            .join("licenses")
            .join(format!("LICENSE.{}", self.definition.name));
        let output_path = dpkg_path.join("copyright");

        if license_path.exists() {
            copy_file(&license_path, &output_path)
        } else {
            tracing::warn!("Missing license file: {}", license_path.display());
            write_string(&output_path, "\n")
        }
    }

    fn generate_install_files(&self, dpkg_path: &Path) -> Result<()> {
        let package_name = self.package_name().replace('-', "_");
        let values = [("package_name", package_name.as_str())];

        if !self.definition.dpkg_template_install.is_empty() {
            for template_file in &self.definition.dpkg_template_install {
                self.generate_file(Some(template_file), "", &values, &dpkg_path.join(template_file))?;
            }
        } else if self.has_bin_directory() {
            self.generate_python3_module_install_file(dpkg_path, &values)?;
            self.generate_file(
                None,
                INSTALL_TEMPLATE_TOOLS,
                &values,
                &dpkg_path.join(format!("{}-tools.install", self.package_name())),
            )?;
        }
        Ok(())
    }

    fn generate_python3_module_install_file(&self, dpkg_path: &Path, values: &[(&str, &str)]) -> Result<()> {
        if !self.definition.dpkg_template_install_python3.is_empty() {
            for template_file in &self.definition.dpkg_template_install_python3 {
                self.generate_file(Some(template_file), "", values, &dpkg_path.join(template_file))?;
            }
            return Ok(());
        }

        let output_path = dpkg_path.join(format!("{}.install", self.python3_package_name()));
        let Some(configuration) = self.build_configuration else {
            return self.generate_file(None, INSTALL_TEMPLATE_PYTHON3, values, &output_path);
        };

        let mut lines: Vec<String> = Vec::new();
        if configuration.has_module_source_files {
            lines.push("usr/lib/python3*/dist-packages/*.py".to_string());
        }
        if configuration.has_module_shared_object {
            lines.push("usr/lib/python3*/dist-packages/*.so".to_string());
        }
        lines.extend(
            configuration
                .module_directories
                .iter()
                .map(|directory| format!("usr/lib/python3*/dist-packages/{}", directory)),
        );
        if configuration.has_egg_info_directory {
            lines.push("usr/lib/python3*/dist-packages/*.egg-info/*".to_string());
        } else if configuration.has_egg_info_file {
            lines.push("usr/lib/python3*/dist-packages/*.egg-info".to_string());
        }

        // The listing holds no slots, write it as is.
        write_string(&output_path, &lines.join("\n"))
    }

    fn generate_rules_file(&self, dpkg_path: &Path) -> Result<()> {
        let output_path = dpkg_path.join("rules");
        let template_filename = self.definition.dpkg_template_rules.as_deref();

        if self.is_configure_make() {
            let definition = self.definition;
            let configure_options = if !definition.dpkg_configure_options.is_empty() {
                definition.dpkg_configure_options.join(" ")
            } else {
                definition.configure_options_string()
            };
            self.generate_file(
                template_filename,
                RULES_TEMPLATE_CONFIGURE_MAKE,
                &[
                    ("build_system", "--buildsystem=autoconf"),
                    ("configure_options", &configure_options),
                    ("package_name", self.package_name()),
                ],
                &output_path,
            )?;
        } else if self.is_python() {
            self.generate_file(
                template_filename,
                RULES_TEMPLATE_PYTHON,
                &[("setup_name", self.definition.setup_name())],
                &output_path,
            )?;
        }

        if output_path.exists() {
            set_executable(&output_path)?;
        }
        Ok(())
    }
}
