//! Implementation of `l2tdevtools dpkg-generate`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::ProjectDefinitionReader;
use crate::generators::DpkgBuildFilesGenerator;
use crate::util::fs::glob_paths;

/// Options for the dpkg-generate command.
#[derive(Debug, Clone)]
pub struct DpkgGenerateOptions {
    pub project_name: String,

    /// Path of projects.ini
    pub config_file: PathBuf,

    /// Directory with the dpkg templates
    pub data_path: PathBuf,

    /// Source directory, otherwise the single `{name}*` directory in the
    /// working directory
    pub source_directory: Option<PathBuf>,
}

/// Generated dpkg files of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpkgGenerateResult {
    pub project_version: String,
    pub dpkg_path: PathBuf,
}

/// Generate the dpkg packaging files of a project into `{source}/dpkg`.
pub fn dpkg_generate(options: &DpkgGenerateOptions, cwd: &Path) -> Result<DpkgGenerateResult> {
    let name = &options.project_name;

    if !options.config_file.exists() {
        bail!("No such config file: {}.", options.config_file.display());
    }

    let definitions = ProjectDefinitionReader.read_file(&options.config_file)?;
    let Some(definition) = definitions.iter().find(|definition| definition.name == *name) else {
        bail!("No such package name: {}.", name);
    };

    let source_path = match options.source_directory {
        Some(ref path) => cwd.join(path),
        None => {
            let candidates: Vec<PathBuf> = glob_paths(cwd, &format!("{}*", glob::Pattern::escape(name)))?
                .into_iter()
                .filter(|path| path.is_dir())
                .collect();
            match <[PathBuf; 1]>::try_from(candidates) {
                Ok([path]) => path,
                Err(_) => bail!("Unable to determine source directory."),
            }
        }
    };
    if !source_path.exists() {
        bail!("No such source directory: {}.", source_path.display());
    }
    let source_path = std::path::absolute(&source_path)?;

    let directory_name = source_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(project_version) = directory_name.strip_prefix(&format!("{}-", name)) else {
        bail!(
            "Unable to determine project version based on source directory: {}.",
            source_path.display()
        );
    };

    let dpkg_path = source_path.join("dpkg");
    if dpkg_path.exists() {
        bail!("Destination dpkg directory: {} already exists.", dpkg_path.display());
    }

    tracing::info!(
        "Generating dpkg files for: {} {} in: {}",
        name,
        project_version,
        dpkg_path.display()
    );
    DpkgBuildFilesGenerator::new(definition, project_version, &options.data_path).generate_files(&dpkg_path)?;

    Ok(DpkgGenerateResult {
        project_version: project_version.to_string(),
        dpkg_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PROJECTS_INI: &str = "\
[dfdatetime]
build_system: setup_py
description_short: Digital Forensics date and time library
description_long: Digital Forensics date and time library
download_url: https://github.com/log2timeline/dfdatetime/releases
homepage_url: https://github.com/log2timeline/dfdatetime
maintainer: Log2Timeline maintainers <log2timeline-maintainers@googlegroups.com>
";

    fn options(tmp: &TempDir, name: &str) -> DpkgGenerateOptions {
        let config_file = tmp.path().join("projects.ini");
        fs::write(&config_file, PROJECTS_INI).unwrap();
        DpkgGenerateOptions {
            project_name: name.to_string(),
            config_file,
            data_path: tmp.path().join("data"),
            source_directory: None,
        }
    }

    #[test]
    fn test_dpkg_generate() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("dfdatetime-20240101")).unwrap();

        let result = dpkg_generate(&options(&tmp, "dfdatetime"), tmp.path()).unwrap();
        assert_eq!(result.project_version, "20240101");
        assert!(result.dpkg_path.join("control").exists());
        assert!(result.dpkg_path.join("changelog").exists());
    }

    #[test]
    fn test_dpkg_generate_existing_dpkg_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("dfdatetime-20240101").join("dpkg")).unwrap();

        let error = dpkg_generate(&options(&tmp, "dfdatetime"), tmp.path()).unwrap_err();
        assert!(error.to_string().contains("already exists"));
    }

    #[test]
    fn test_dpkg_generate_undefined_project() {
        let tmp = TempDir::new().unwrap();
        let error = dpkg_generate(&options(&tmp, "plaso"), tmp.path()).unwrap_err();
        assert_eq!(error.to_string(), "No such package name: plaso.");
    }

    #[test]
    fn test_dpkg_generate_ambiguous_source_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("dfdatetime-20190101")).unwrap();
        fs::create_dir(tmp.path().join("dfdatetime-20240101")).unwrap();

        let error = dpkg_generate(&options(&tmp, "dfdatetime"), tmp.path()).unwrap_err();
        assert_eq!(error.to_string(), "Unable to determine source directory.");
    }
}
