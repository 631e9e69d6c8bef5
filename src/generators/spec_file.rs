//! RPM spec file generation.
//!
//! A spec file produced by `setup.py bdist_rpm --spec-only` is rewritten
//! into one that builds a `python3-` package, with optional data and tools
//! sub packages.

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::ProjectDefinition;
use crate::util::fs::{read_to_string, write_string};
use crate::util::process::{find_python, ProcessBuilder};
use crate::util::template::format_slots;

const EMAIL_ADDRESS: &str = "log2timeline development team <log2timeline-dev@googlegroups.com>";

const DOC_FILENAMES: &[&str] = &[
    "CHANGES",
    "CHANGES.txt",
    "CHANGES.TXT",
    "README",
    "README.txt",
    "README.TXT",
];

const LICENSE_FILENAMES: &[&str] = &["LICENSE", "LICENSE.txt", "LICENSE.TXT"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecFileError {
    #[error("Unsupported requires statement: \"{0}\".")]
    UnsupportedRequires(String),
}

/// Split a `Requires: ` or `BuildRequires: ` line into sorted requirements.
///
/// Comma separated values are split on the commas. Space separated values
/// keep `name >= version` and `name == version` groups together.
pub fn split_requires(requires: &str) -> Result<Vec<String>, SpecFileError> {
    if requires.is_empty() {
        return Ok(Vec::new());
    }
    if !requires.starts_with("BuildRequires: ") && !requires.starts_with("Requires: ") {
        return Err(SpecFileError::UnsupportedRequires(requires.to_string()));
    }

    let values = requires
        .trim()
        .split_once(' ')
        .map(|(_, values)| values)
        .unwrap_or_default();

    let mut requires_list: Vec<String> = if values.contains(',') {
        values.split(',').map(|value| value.trim().to_string()).collect()
    } else {
        let segments: Vec<&str> = values.split(' ').map(str::trim).collect();
        let mut groups = Vec::new();
        let mut start = 0;
        while start < segments.len() {
            let mut end = start + 1;
            if end < segments.len() && matches!(segments[end], ">=" | "==") {
                end += 2;
            }
            let end = end.min(segments.len());
            groups.push(segments[start..end].join(" "));
            start = end;
        }
        groups
    };

    requires_list.sort();
    Ok(requires_list)
}

/// Rewrite Python 2 requirement names to their Python 3 counterparts and
/// drop `backports` and `pysqlite` requirements.
pub fn python3_requires(requires: &str) -> Result<Vec<String>, SpecFileError> {
    let requires = requires
        .replace("-python2 ", "-python3 ")
        .replace("-python ", "-python3 ")
        .replace(" python2-", " python3-")
        .replace(" python-", " python3-");

    Ok(split_requires(&requires)?
        .into_iter()
        .filter(|require| !require.contains("backports") && !require.contains("pysqlite"))
        .collect())
}

/// Values captured from a setup.py generated spec file.
#[derive(Debug, Default)]
struct GeneratedSpecFile {
    version: String,
    description: String,
    license: String,
    packager: String,
    requires: String,
    summary: String,
    url: String,
    vendor: String,
    build_requires: String,
    python_package_requires: String,
    has_data_package: bool,
    has_tools_package: bool,
}

impl GeneratedSpecFile {
    fn parse(content: &str) -> Self {
        let mut spec = GeneratedSpecFile::default();
        let mut in_description = false;
        let mut in_python_package = false;

        for line in content.split_inclusive('\n') {
            if in_description {
                if line.starts_with('%') {
                    in_description = false;
                } else if spec.description.is_empty() && line == "\n" {
                    continue;
                } else {
                    spec.description.push_str(line);
                }
            }

            if in_python_package {
                if line.starts_with("%package") || line.starts_with("%prep") {
                    in_python_package = false;
                } else if spec.python_package_requires.is_empty() && line.starts_with("Requires: ") {
                    spec.python_package_requires = line.to_string();
                }
            }

            if in_description || in_python_package {
                continue;
            }

            let value = || {
                line.trim()
                    .split_once(' ')
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_default()
            };

            if line.starts_with("%define version ") {
                spec.version = line.trim().rsplit(' ').next().unwrap_or_default().to_string();
            } else if line.starts_with("BuildRequires: ") {
                spec.build_requires = line.to_string();
            } else if spec.license.is_empty() && line.starts_with("License: ") {
                spec.license = value();
            } else if spec.packager.is_empty() && line.starts_with("Packager: ") {
                spec.packager = value();
            } else if spec.summary.is_empty() && line.starts_with("Summary: ") {
                spec.summary = value();
            } else if spec.url.is_empty() && line.starts_with("Url: ") {
                spec.url = value();
            } else if spec.vendor.is_empty() && line.starts_with("Vendor: ") {
                spec.vendor = value();
            } else if spec.description.is_empty() && spec.requires.is_empty() && line.starts_with("Requires: ") {
                spec.requires = line.to_string();
            } else if line.starts_with("%description") && spec.description.is_empty() {
                in_description = true;
            } else if line.starts_with("%package -n %{name}-data") {
                spec.has_data_package = true;
            } else if line.starts_with("%package -n %{name}-tools") {
                spec.has_tools_package = true;
            } else if line.starts_with("%package -n python-")
                || line.starts_with("%package -n python2-")
                || line.starts_with("%package -n python3-")
            {
                in_python_package = true;
            } else if line.starts_with("%files") {
                break;
            }
        }

        spec
    }
}

fn changelog_date() -> String {
    chrono::Local::now().format("%a %b %e %Y").to_string()
}

/// Generates RPM spec files.
#[derive(Debug)]
pub struct RpmSpecFileGenerator<'a> {
    data_path: &'a Path,
}

impl<'a> RpmSpecFileGenerator<'a> {
    pub fn new(data_path: &'a Path) -> Self {
        RpmSpecFileGenerator { data_path }
    }

    /// Run `setup.py bdist_rpm --spec-only` in the source directory, which
    /// writes the spec file into `dist/`.
    pub fn generate_with_setup_py(&self, source_directory: &Path, log_path: &Path) -> bool {
        ProcessBuilder::new(find_python())
            .args(["setup.py", "bdist_rpm", "--spec-only"])
            .cwd(source_directory)
            .append_to_log(log_path)
            .run()
    }

    /// Rewrite a setup.py generated spec file, or render the project's
    /// `rpm_template_spec` template instead when it has one.
    #[allow(clippy::too_many_arguments)]
    pub fn rewrite_setup_py_generated_file(
        &self,
        definition: &ProjectDefinition,
        source_directory: &Path,
        source_filename: &str,
        project_name: &str,
        project_version: &str,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        let output = match &definition.rpm_template_spec {
            Some(template_filename) => self.spec_file_from_template(template_filename, project_version)?,
            None => {
                let mut build_dependencies: Vec<String> = if definition.architecture_dependent {
                    vec!["gcc".into(), "python3-devel".into(), "python3-setuptools".into()]
                } else {
                    vec!["python3-devel".into(), "python3-setuptools".into()]
                };
                build_dependencies.extend(definition.rpm_build_dependencies.iter().cloned());

                let content = read_to_string(input_path)?;
                self.rewrite(
                    definition,
                    source_directory,
                    source_filename,
                    project_name,
                    &build_dependencies,
                    &content,
                )?
            }
        };

        write_string(output_path, &output)
    }

    /// Rewrite a spec file in place for the Open Build Service.
    pub fn rewrite_setup_py_generated_file_for_osc(&self, spec_path: &Path) -> Result<()> {
        let content = read_to_string(spec_path)?;
        write_string(spec_path, &content)
    }

    fn spec_file_from_template(&self, template_filename: &str, project_version: &str) -> Result<String> {
        let template_path = self.data_path.join("rpm_templates").join(template_filename);
        let template = read_to_string(&template_path)?;
        let date_time = changelog_date();

        format_slots(&template, &[("date_time", &date_time), ("version", project_version)])
            .with_context(|| format!("invalid template: {}", template_path.display()))
    }

    fn rewrite(
        &self,
        definition: &ProjectDefinition,
        source_directory: &Path,
        source_filename: &str,
        project_name: &str,
        build_dependencies: &[String],
        content: &str,
    ) -> Result<String> {
        let spec = GeneratedSpecFile::parse(content);

        let package_name = definition.rpm_name.as_deref().unwrap_or(project_name);
        let package_name = package_name.strip_prefix("python-").unwrap_or(package_name);
        let unmangled_name = (package_name != project_name).then_some(project_name);

        let description = match &definition.description_long {
            Some(description) => format!("{}\n\n", description),
            None => spec.description.clone(),
        };
        let build_requires = if build_dependencies.is_empty() {
            split_requires(&spec.build_requires)?
        } else {
            build_dependencies.to_vec()
        };

        let python_package_name = if unmangled_name.is_some() {
            format!("python3-{}", package_name)
        } else {
            "python3-%{name}".to_string()
        };
        let requires = if spec.python_package_requires.is_empty() {
            &spec.requires
        } else {
            &spec.python_package_requires
        };
        let requires = python3_requires(requires)?;

        let mut output = String::new();

        // Header.
        output.push_str(&format!("%define name {}\n", project_name));
        output.push_str(&format!("%define version {}\n", spec.version));
        if let Some(unmangled_name) = unmangled_name {
            output.push_str(&format!("%define unmangled_name {}\n", unmangled_name));
            output.push_str(&format!("%define unmangled_version {}\n", spec.version));
        }
        output.push_str("%define release 1\n\n");

        // Source package.
        let extension = if source_filename.ends_with(".zip") { "zip" } else { "tar.gz" };
        let (source, build_root) = match unmangled_name {
            Some(_) => (
                format!("%{{unmangled_name}}-%{{unmangled_version}}.{}", extension),
                "%{_tmppath}/%{unmangled_name}-%{version}-%{release}-buildroot",
            ),
            None => (
                format!("%{{name}}-%{{version}}.{}", extension),
                "%{_tmppath}/%{name}-%{version}-%{release}-buildroot",
            ),
        };
        output.push_str(&format!("Summary: {}\n", spec.summary));
        output.push_str("Name: %{name}\nVersion: %{version}\nRelease: %{release}\n");
        output.push_str(&format!("Source0: {}\n", source));
        output.push_str(&format!("License: {}\n", spec.license));
        output.push_str("Group: Development/Libraries\n");
        output.push_str(&format!("BuildRoot: {}\n", build_root));
        output.push_str("Prefix: %{_prefix}\n");
        if !definition.architecture_dependent {
            output.push_str("BuildArch: noarch\n");
        }
        output.push_str(&format!("Vendor: {}\n", spec.vendor));
        if !spec.packager.is_empty() {
            output.push_str(&format!("Packager: {}\n", spec.packager));
        }
        output.push_str(&format!("Url: {}\n", spec.url));
        if !build_requires.is_empty() {
            output.push_str(&format!("BuildRequires: {}\n", build_requires.join(", ")));
        }
        output.push_str(&format!("\n%description\n{}", description));

        if spec.has_data_package {
            output.push_str(&format!(
                "%package -n %{{name}}-data\nSummary: Data files for {}\n\n%description -n %{{name}}-data\n{}",
                spec.summary, description
            ));
        }

        output.push_str(&format!("%package -n {}\n", python_package_name));
        if !requires.is_empty() {
            output.push_str(&format!("Requires: {}\n", requires.join(", ")));
        }
        output.push_str(&format!(
            "Summary: Python 3 module of {}\n\n%description -n {}\n{}",
            spec.summary, python_package_name, description
        ));

        if spec.has_tools_package {
            output.push_str(&format!(
                "%package -n %{{name}}-tools\nRequires: python3-{} >= %{{version}}\nSummary: Tools for {}\n\n%description -n %{{name}}-tools\n{}",
                project_name, spec.summary, description
            ));
        }

        // Build steps.
        let setup_directory = if project_name == "psutil" {
            "%{name}-release-%{version}"
        } else if unmangled_name.is_some() {
            "%{unmangled_name}-%{unmangled_version}"
        } else {
            "%{name}-%{version}"
        };
        output.push_str(&format!(
            "%prep\n%autosetup -n {}\n\n%build\n%py3_build\n\n%install\n{}\n%clean\nrm -rf %{{buildroot}}\n\n",
            setup_directory,
            install_definition(project_name)
        ));

        // Files.
        if spec.has_data_package {
            output.push_str(
                "%files -n %{name}-data\n%defattr(644,root,root,755)\n%license LICENSE\n%doc ACKNOWLEDGEMENTS AUTHORS README\n%{_datadir}/%{name}/*\n\n",
            );
        }

        let setup_name = definition.setup_name.as_deref().unwrap_or(project_name).replace('-', "_");
        output.push_str(&format!("%files -n {}\n", python_package_name));
        output.push_str(&format!("{}\n", license_file_definition(source_directory)));
        output.push_str(&format!("{}\n", documentation_files_definition(source_directory)));
        let site_packages = if definition.architecture_dependent {
            "%{_libdir}/python3*/site-packages"
        } else {
            "%{python3_sitelib}"
        };
        output.push_str(&format!("{}/{}\n", site_packages, setup_name));
        output.push_str(&format!("{}/{}*.egg-info\n\n", site_packages, setup_name));

        if spec.has_tools_package {
            output.push_str("%files -n %{name}-tools\n%{_bindir}/*.py\n\n");
        }

        if matches!(project_name, "chardet" | "dtfabric" | "pbr") {
            output.push_str("%exclude %{_bindir}/*\n\n");
        }
        if project_name == "dfvfs" {
            output.push_str("%exclude %{python3_sitelib}/examples\n\n");
        }

        output.push_str(&format!(
            "%changelog\n* {} {} {}-1\n- Auto-generated\n",
            changelog_date(),
            EMAIL_ADDRESS,
            spec.version
        ));

        Ok(output)
    }
}

fn install_definition(project_name: &str) -> String {
    let mut lines = vec![
        "%py3_install",
        "rm -rf %{buildroot}/usr/lib/python*/site-packages/*.egg-info/requires.txt",
        "rm -rf %{buildroot}/usr/share/doc/%{name}/",
    ];
    match project_name {
        "astroid" => lines.push("rm -rf %{buildroot}%{python3_sitelib}/astroid/tests"),
        "pylint" => lines.push("rm -rf %{buildroot}%{python3_sitelib}/pylint/test"),
        _ => {}
    }
    lines.push("");
    lines.join("\n")
}

fn license_file_definition(source_directory: &Path) -> String {
    LICENSE_FILENAMES
        .iter()
        .find(|filename| source_directory.join(filename).exists())
        .map(|filename| format!("%license {}", filename))
        .unwrap_or_default()
}

fn documentation_files_definition(source_directory: &Path) -> String {
    let doc_files: Vec<&str> = DOC_FILENAMES
        .iter()
        .copied()
        .filter(|filename| source_directory.join(filename).exists())
        .collect();

    if doc_files.is_empty() {
        String::new()
    } else {
        format!("%doc {}", doc_files.join(" "))
    }
}
