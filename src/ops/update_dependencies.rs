//! Implementation of `l2tdevtools update-dependencies`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::core::{DependencyHelper, ProjectConfigurationReader};
use crate::dependency_writers::{
    AppveyorYmlWriter, DependencyFileWriter, DpkgCompatWriter, DpkgControlWriter, DpkgRulesWriter,
    GiftCoprInstallScriptWriter, GiftPpaInstallScriptWriter, GitHubActionsTestDockerYmlWriter,
    GitHubActionsTestDocsYmlWriter, GitHubActionsTestToxYmlWriter, PylintRcWriter, PyprojectTomlWriter,
    RequirementsWriter, SetupCfgWriter, SetupPyWriter, SphinxBuildConfigurationWriter,
    SphinxBuildRequirementsWriter, TestRequirementsWriter, ToxIniWriter, TravisInstallScriptWriter,
    TravisYmlWriter, WriterContext,
};
use crate::util::fs::remove_path;

/// Scripts superseded by the ones the writers generate.
const LEGACY_FILES: &[&str] = &["config/linux/gift_ppa_install.sh"];

/// Options for the update-dependencies command.
#[derive(Debug, Clone)]
pub struct UpdateDependenciesOptions {
    /// Directory with `dependencies.ini`
    pub project_path: PathBuf,

    /// Directory with the templates
    pub data_path: PathBuf,

    /// Project configuration file, `{project_name}.ini` in the project
    /// directory by default
    pub project_file: Option<PathBuf>,
}

/// Regenerate the dependency files of a project. Returns the paths of the
/// written files.
///
/// The requirements, setup and pylint files are always written. The other
/// files are only rewritten when the project already has them.
pub fn update_dependencies(options: &UpdateDependenciesOptions) -> Result<Vec<PathBuf>> {
    let project_path = &options.project_path;
    if !project_path.is_dir() {
        bail!("No such project directory: {}.", project_path.display());
    }

    let dependencies_file = project_path.join("dependencies.ini");
    if !dependencies_file.exists() {
        bail!("No such dependencies file: {}.", dependencies_file.display());
    }

    let project_name = project_path
        .canonicalize()
        .with_context(|| format!("failed to resolve: {}", project_path.display()))?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let project_file = options
        .project_file
        .clone()
        .unwrap_or_else(|| project_path.join(format!("{}.ini", project_name)));
    if !project_file.is_file() {
        bail!("No such project configuration file: {}.", project_file.display());
    }

    let project = ProjectConfigurationReader.read_file(&project_file, &project_name)?;
    let helper = DependencyHelper::load(&dependencies_file, &project_path.join("test_dependencies.ini"))?;
    let context = WriterContext::new(&options.data_path, &project, &helper);

    let writers: Vec<Box<dyn DependencyFileWriter + '_>> = vec![
        Box::new(PylintRcWriter::new(context.clone())),
        Box::new(RequirementsWriter::new(context.clone())),
        Box::new(TestRequirementsWriter::new(context.clone())),
        Box::new(SetupCfgWriter::new(context.clone())),
        Box::new(SetupPyWriter::new(context.clone())),
    ];

    let existing_file_writers: Vec<Box<dyn DependencyFileWriter + '_>> = vec![
        Box::new(GitHubActionsTestDockerYmlWriter::new(context.clone())),
        Box::new(GitHubActionsTestDocsYmlWriter::new(context.clone())),
        Box::new(GitHubActionsTestToxYmlWriter::new(context.clone())),
        Box::new(AppveyorYmlWriter::new(context.clone())),
        Box::new(DpkgCompatWriter::new(context.clone())),
        Box::new(DpkgControlWriter::new(context.clone())),
        Box::new(DpkgRulesWriter::new(context.clone())),
        Box::new(GiftCoprInstallScriptWriter::new(context.clone())),
        Box::new(GiftPpaInstallScriptWriter::new(context.clone())),
        Box::new(PyprojectTomlWriter::new(context.clone())),
        Box::new(SphinxBuildConfigurationWriter::new(context.clone())),
        Box::new(SphinxBuildRequirementsWriter::new(context.clone())),
        Box::new(ToxIniWriter::new(context.clone())),
        Box::new(TravisInstallScriptWriter::new(context.clone())),
        Box::new(TravisYmlWriter::new(context)),
    ];

    let mut written = Vec::with_capacity(writers.len() + existing_file_writers.len());
    for writer in &writers {
        tracing::debug!("Writing: {}", writer.path());
        writer.write(project_path)?;
        written.push(project_path.join(writer.path()));
    }

    for writer in &existing_file_writers {
        let path = project_path.join(writer.path());
        if !path.exists() {
            tracing::debug!("Skipping: {}", writer.path());
            continue;
        }
        tracing::debug!("Writing: {}", writer.path());
        writer.write(project_path)?;
        written.push(path);
    }

    for legacy_file in LEGACY_FILES {
        let path = project_path.join(legacy_file);
        if path.is_file() {
            remove_path(&path)?;
        }
    }

    Ok(written)
}
