//! Implementation of `l2tdevtools build`.
//!
//! Downloads the latest version of each selected project and builds it
//! with the build helper of the target packaging format.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::builder::{detect_build_system, new_build_helper, BuildContext, BuildHelper, BuildTarget};
use crate::core::{preset_project_names, PresetDefinitionReader, ProjectDefinition, ProjectDefinitionReader};
use crate::download_helpers::new_download_helper;
use crate::sources::{SourceHelper, SourcePackageHelper};
use crate::util::config::Config;
use crate::util::fs::{ensure_dir, remove_path};
use crate::util::process::ProcessBuilder;
use crate::util::url_lib::HttpClient;

/// Script run after each download of the `download` target, when present
/// in the working directory.
const POST_DOWNLOAD_SCRIPT: &str = "post-download.sh";

/// What the build command produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Only download the source packages.
    Download,
    Build(BuildTarget),
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "download" {
            return Ok(Target::Download);
        }
        Ok(Target::Build(s.parse()?))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Download => f.write_str("download"),
            Target::Build(target) => fmt::Display::fmt(target, f),
        }
    }
}

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub target: Target,

    /// Directory sources are extracted into and packages are written to
    pub build_directory: PathBuf,

    /// Directory with projects.ini, presets.ini and the packaging data
    pub config_directory: PathBuf,

    /// Distributions to build dpkg source packages for
    pub distributions: Vec<String>,

    /// Directory source packages are downloaded to, the build directory
    /// when unset
    pub downloads_directory: Option<PathBuf>,

    pub preset: Option<String>,

    pub projects: Vec<String>,
}

/// Outcome of a build run, per project.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub undefined_projects: BTreeSet<String>,
    pub configuration_errors: BTreeSet<String>,
    pub failed_downloads: BTreeSet<String>,
    pub missing_build_dependencies: BTreeSet<String>,
    pub failed_builds: BTreeSet<String>,
}

impl BuildSummary {
    pub fn is_success(&self) -> bool {
        self.undefined_projects.is_empty()
            && self.configuration_errors.is_empty()
            && self.failed_downloads.is_empty()
            && self.missing_build_dependencies.is_empty()
            && self.failed_builds.is_empty()
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("Undefined projects:", &self.undefined_projects),
            ("Projects with configuration errors:", &self.configuration_errors),
            ("Failed downloading:", &self.failed_downloads),
            ("Missing build dependencies:", &self.missing_build_dependencies),
            ("Failed building:", &self.failed_builds),
        ];

        for (title, names) in sections {
            if names.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{}", title)?;
            for name in names {
                writeln!(f, "\t{}", name)?;
            }
        }
        Ok(())
    }
}

/// A project whose source package was downloaded.
struct Project {
    definition: ProjectDefinition,
    source: SourcePackageHelper,
}

/// Downloads and builds projects for one target.
pub struct ProjectBuilder {
    target: Target,
    config: Config,
    data_path: PathBuf,
    build_directory: PathBuf,
    downloads_directory: PathBuf,
    client: Arc<dyn HttpClient>,
    project_definitions: BTreeMap<String, ProjectDefinition>,
}

impl fmt::Debug for ProjectBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectBuilder")
            .field("target", &self.target)
            .field("data_path", &self.data_path)
            .field("build_directory", &self.build_directory)
            .field("downloads_directory", &self.downloads_directory)
            .finish_non_exhaustive()
    }
}

impl ProjectBuilder {
    pub fn new(
        target: Target,
        config: Config,
        data_path: impl Into<PathBuf>,
        build_directory: impl Into<PathBuf>,
        downloads_directory: impl Into<PathBuf>,
        client: Arc<dyn HttpClient>,
    ) -> Self {
        ProjectBuilder {
            target,
            config,
            data_path: data_path.into(),
            build_directory: build_directory.into(),
            downloads_directory: downloads_directory.into(),
            client,
            project_definitions: BTreeMap::new(),
        }
    }

    pub fn with_project_definitions(mut self, definitions: &[ProjectDefinition]) -> Self {
        self.project_definitions = definitions
            .iter()
            .map(|definition| (definition.name.clone(), definition.clone()))
            .collect();
        self
    }

    fn build_context(&self, definition: &ProjectDefinition, distribution: Option<&str>) -> BuildContext {
        let mut definition = definition.clone();
        if definition.maintainer.is_none() {
            definition.maintainer = self.config.dpkg.maintainer.clone();
        }

        BuildContext::new(definition, &self.data_path, &self.build_directory)
            .with_dependency_definitions(self.project_definitions.clone())
            .with_downloads_directory(&self.downloads_directory)
            .with_distribution(distribution.map(str::to_string))
            .with_version_suffix(&self.config.dpkg.version_suffix)
            .with_osc_project(&self.config.osc.project)
            .with_http_client(self.client.clone())
    }

    fn build_helper(
        &self,
        target: BuildTarget,
        definition: &ProjectDefinition,
        distribution: Option<&str>,
    ) -> Result<Option<Box<dyn BuildHelper>>> {
        let Some(ref build_system) = definition.build_system else {
            return Ok(None);
        };
        new_build_helper(self.build_context(definition, distribution), build_system, target)
    }

    /// Download the source package of a project.
    ///
    /// Returns `None` if the download failed.
    fn download(&self, definition: &ProjectDefinition) -> Result<Option<Project>> {
        let download_helper = match new_download_helper(definition, self.client.clone()) {
            Ok(download_helper) => download_helper,
            Err(e) => {
                tracing::warn!("{:#}", e);
                return Ok(None);
            }
        };

        let mut source = SourcePackageHelper::new(
            definition.name.clone(),
            Some(definition.clone()),
            &self.downloads_directory,
            &self.build_directory,
            download_helper,
        );
        source.clean()?;

        let Some(source_package) = source.download()? else {
            return Ok(None);
        };

        if self.target == Target::Download && Path::new(POST_DOWNLOAD_SCRIPT).exists() {
            let succeeded = ProcessBuilder::new("sh")
                .arg(format!("./{}", POST_DOWNLOAD_SCRIPT))
                .arg(&source_package)
                .run();
            if !succeeded {
                return Ok(None);
            }
        }

        Ok(Some(Project {
            definition: definition.clone(),
            source,
        }))
    }

    /// Extract the source and check the build dependencies.
    ///
    /// The build system is detected from the source when the definition
    /// does not name one.
    fn check_build_dependencies(&self, target: BuildTarget, project: &mut Project) -> Result<Vec<String>> {
        let name = project.definition.name.clone();

        if project.source.source_package_path()?.is_none() {
            tracing::info!("Missing source package of: {}", name);
            return Ok(Vec::new());
        }
        let Some(source_directory) = project.source.create()? else {
            tracing::error!("Extraction of source package of: {} failed", name);
            return Ok(Vec::new());
        };

        if project.definition.build_system.is_none() {
            match detect_build_system(&source_directory) {
                Some(build_system) => project.definition.build_system = Some(build_system),
                None => {
                    tracing::warn!("Unable to determine build system of: {}", name);
                    return Ok(Vec::new());
                }
            }
        }

        match self.build_helper(target, &project.definition, None)? {
            Some(helper) => Ok(helper.check_build_dependencies()),
            None => {
                tracing::warn!("Unable to determine how to build: {}", name);
                Ok(Vec::new())
            }
        }
    }

    fn check_project_configuration(&self, target: BuildTarget, project: &Project) -> bool {
        match self.build_helper(target, &project.definition, None) {
            Ok(Some(helper)) => helper.check_project_configuration(),
            Ok(None) => {
                tracing::warn!("Missing build helper.");
                false
            }
            Err(e) => {
                tracing::error!("{:#}", e);
                false
            }
        }
    }

    /// Build a project for one distribution.
    fn build_project(&self, helper: &dyn BuildHelper, source: &mut dyn SourceHelper) -> Result<bool> {
        let build_required = helper.check_build_required(source);
        helper.clean(source)?;

        if !build_required {
            return Ok(true);
        }
        let built = match helper.build(source) {
            Ok(built) => built,
            Err(e) => {
                tracing::error!("{:#}", e);
                false
            }
        };
        if built {
            return Ok(true);
        }

        let log_path = helper.context().log_path();
        if log_path.exists() {
            let failed_log_path = self
                .build_directory
                .join(format!("{}_{}", source.project_name(), crate::builder::LOG_FILENAME));
            if failed_log_path.exists() {
                std::fs::remove_file(&failed_log_path)?;
            }
            std::fs::rename(&log_path, &failed_log_path)?;
            tracing::warn!(
                "Build of: {} failed, for more information check {}",
                source.project_name(),
                failed_log_path.display()
            );
        } else {
            tracing::warn!("Build of: {} failed.", source.project_name());
        }
        Ok(false)
    }

    /// Build a project for each of the distributions.
    fn build(&self, target: BuildTarget, project: &mut Project, distributions: &[Option<String>]) -> Result<bool> {
        for distribution in distributions {
            let Some(helper) = self.build_helper(target, &project.definition, distribution.as_deref())?
            else {
                tracing::warn!("Missing build helper.");
                return Ok(false);
            };
            if !self.build_project(helper.as_ref(), &mut project.source)? {
                return Ok(false);
            }
        }

        let log_path = self.build_directory.join(crate::builder::LOG_FILENAME);
        if log_path.exists() {
            remove_path(&log_path)?;
        }
        Ok(true)
    }

    /// Distributions to build for: the given ones, else the configured
    /// ones, else the default distribution for dpkg source packages.
    fn distributions(&self, requested: &[String]) -> Vec<Option<String>> {
        if !requested.is_empty() {
            return requested.iter().cloned().map(Some).collect();
        }
        if self.target != Target::Build(BuildTarget::DpkgSource) {
            return vec![None];
        }
        if !self.config.build.distributions.is_empty() {
            return self.config.build.distributions.iter().cloned().map(Some).collect();
        }
        vec![Some(self.config.dpkg.default_distribution.clone())]
    }

    /// Download and build the named projects.
    ///
    /// `skip_disabled` is set when the projects were selected through a
    /// preset. Disabled projects are then skipped instead of built.
    pub fn run(
        &self,
        project_names: &[String],
        skip_disabled: bool,
        distributions: &[String],
    ) -> Result<BuildSummary> {
        let mut summary = BuildSummary::default();
        let mut undefined: BTreeSet<String> = project_names.iter().cloned().collect();

        let mut definitions = Vec::new();
        for definition in self.project_definitions.values() {
            if !undefined.remove(&definition.name) {
                continue;
            }
            if definition.is_disabled_for(&self.target.to_string()) {
                if skip_disabled {
                    tracing::info!("Skipping disabled project: {}", definition.name);
                    continue;
                }
                tracing::info!("Ignoring disabled status for: {}", definition.name);
            }
            definitions.push(definition);
        }
        summary.undefined_projects = undefined;

        ensure_dir(&self.build_directory)?;
        ensure_dir(&self.downloads_directory)?;

        let mut projects = Vec::new();
        for definition in definitions {
            match self.download(definition)? {
                Some(project) => projects.push(project),
                None => {
                    println!("Failed downloading: {}", definition.name);
                    summary.failed_downloads.insert(definition.name.clone());
                }
            }
        }

        let Target::Build(target) = self.target else {
            return Ok(summary);
        };

        let mut builds = Vec::new();
        for mut project in projects {
            let name = project.definition.name.clone();

            let dependencies = self.check_build_dependencies(target, &mut project)?;
            if !dependencies.is_empty() {
                println!(
                    "Unable to build: {} missing build dependencies: {}",
                    name,
                    dependencies.join(", ")
                );
                summary.missing_build_dependencies.extend(dependencies);
                continue;
            }
            if !self.check_project_configuration(target, &project) {
                println!("Detected error in configuration of: {}", name);
                summary.configuration_errors.insert(name);
                continue;
            }
            builds.push(project);
        }

        let distributions = self.distributions(distributions);
        for mut project in builds {
            tracing::info!("Building: {}", project.definition.name);
            if !self.build(target, &mut project, &distributions)? {
                println!("Failed building: {}", project.definition.name);
                summary.failed_builds.insert(project.definition.name.clone());
            }
        }

        Ok(summary)
    }
}

/// Run the build command.
pub fn build(options: BuildOptions, config: Config, client: Arc<dyn HttpClient>) -> Result<BuildSummary> {
    let projects_file = options.config_directory.join("projects.ini");
    let presets_file = options.config_directory.join("presets.ini");

    if options.preset.is_none() && options.projects.is_empty() {
        bail!("Please define a preset or projects to build.");
    }
    if options.preset.is_some() && !presets_file.exists() {
        bail!("No such config file: {}.", presets_file.display());
    }
    if !projects_file.exists() {
        bail!("No such config file: {}.", projects_file.display());
    }

    let project_names = match options.preset {
        Some(ref preset) => {
            let presets = PresetDefinitionReader.read_file(&presets_file)?;
            match preset_project_names(&presets, preset) {
                Some(names) if !names.is_empty() => names,
                _ => bail!("Undefined preset: {}", preset),
            }
        }
        None => options.projects.clone(),
    };

    let definitions = ProjectDefinitionReader
        .read_file(&projects_file)
        .with_context(|| format!("failed to read: {}", projects_file.display()))?;

    let build_directory = std::path::absolute(&options.build_directory)?;
    let downloads_directory = match options.downloads_directory {
        Some(ref path) => std::path::absolute(path)?,
        None => build_directory.clone(),
    };

    let builder = ProjectBuilder::new(
        options.target,
        config,
        std::path::absolute(&options.config_directory)?,
        build_directory,
        downloads_directory,
        client,
    )
    .with_project_definitions(&definitions);

    builder.run(&project_names, options.preset.is_some(), &options.distributions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockHttpClient, MockHttpResponse};
    use std::fs;
    use tempfile::TempDir;

    fn definition(name: &str, download_url: &str) -> ProjectDefinition {
        let mut definition = ProjectDefinition::new(name);
        definition.download_url = download_url.to_string();
        definition
    }

    fn builder(tmp: &TempDir, target: Target, client: Arc<dyn HttpClient>) -> ProjectBuilder {
        ProjectBuilder::new(
            target,
            Config::default(),
            tmp.path().join("data"),
            tmp.path().join("build"),
            tmp.path().join("downloads"),
            client,
        )
    }

    #[test]
    fn test_target_from_str() {
        assert_eq!("download".parse::<Target>().unwrap(), Target::Download);
        assert_eq!(
            "dpkg-source".parse::<Target>().unwrap(),
            Target::Build(BuildTarget::DpkgSource)
        );
        assert!("deb".parse::<Target>().is_err());
        assert_eq!(Target::Build(BuildTarget::Wheel).to_string(), "wheel");
    }

    #[test]
    fn test_summary_display() {
        let mut summary = BuildSummary::default();
        assert!(summary.is_success());
        assert_eq!(summary.to_string(), "");

        summary.undefined_projects.insert("unknown".to_string());
        summary.failed_builds.insert("dfvfs".to_string());
        assert!(!summary.is_success());
        assert_eq!(
            summary.to_string(),
            "\nUndefined projects:\n\tunknown\n\nFailed building:\n\tdfvfs\n"
        );
    }

    #[test]
    fn test_distributions() {
        let tmp = TempDir::new().unwrap();
        let client: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());

        let builder = builder(&tmp, Target::Build(BuildTarget::DpkgSource), client.clone());
        assert_eq!(builder.distributions(&[]), vec![Some("jammy".to_string())]);
        assert_eq!(
            builder.distributions(&["focal".to_string(), "noble".to_string()]),
            vec![Some("focal".to_string()), Some("noble".to_string())]
        );

        let builder = self::builder(&tmp, Target::Build(BuildTarget::Dpkg), client);
        assert_eq!(builder.distributions(&[]), vec![None]);
    }

    #[test]
    fn test_run_undefined_and_disabled() {
        let tmp = TempDir::new().unwrap();
        let client: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());

        let mut disabled = definition("libewf", "https://github.com/libyal/libewf/releases");
        disabled.disabled = vec!["dpkg".to_string()];

        let builder = builder(&tmp, Target::Build(BuildTarget::Dpkg), client)
            .with_project_definitions(&[disabled]);
        let summary = builder
            .run(&["libewf".to_string(), "unknown".to_string()], true, &[])
            .unwrap();

        assert!(summary.undefined_projects.contains("unknown"));
        assert!(!summary.undefined_projects.contains("libewf"));
        assert!(summary.failed_downloads.is_empty());
        assert!(tmp.path().join("build").is_dir());
        assert!(tmp.path().join("downloads").is_dir());
    }

    #[test]
    fn test_run_failed_download() {
        let tmp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new());
        client.mock_url(
            "https://github.com/libyal/libewf/releases",
            MockHttpResponse::not_found(),
        );

        let builder = builder(&tmp, Target::Download, client)
            .with_project_definitions(&[
                definition("libewf", "https://github.com/libyal/libewf/releases"),
                definition("unsupported", "https://example.com/unsupported"),
            ]);
        let summary = builder
            .run(&["libewf".to_string(), "unsupported".to_string()], false, &[])
            .unwrap();

        assert_eq!(
            summary.failed_downloads.iter().cloned().collect::<Vec<_>>(),
            vec!["libewf".to_string(), "unsupported".to_string()]
        );
    }

    #[test]
    fn test_build_requires_preset_or_projects() {
        let tmp = TempDir::new().unwrap();
        let options = BuildOptions {
            target: Target::Download,
            build_directory: tmp.path().join("build"),
            config_directory: tmp.path().to_path_buf(),
            distributions: Vec::new(),
            downloads_directory: None,
            preset: None,
            projects: Vec::new(),
        };
        let client: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());

        let error = build(options, Config::default(), client).unwrap_err();
        assert!(error.to_string().contains("Please define a preset or projects"));
    }

    #[test]
    fn test_build_undefined_preset() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("presets.ini"), "[plaso]\nprojects: dfvfs\n").unwrap();
        fs::write(
            tmp.path().join("projects.ini"),
            "[dfvfs]\ndownload_url: https://github.com/log2timeline/dfvfs/releases\n",
        )
        .unwrap();

        let options = BuildOptions {
            target: Target::Download,
            build_directory: tmp.path().join("build"),
            config_directory: tmp.path().to_path_buf(),
            distributions: Vec::new(),
            downloads_directory: None,
            preset: Some("timesketch".to_string()),
            projects: Vec::new(),
        };
        let client: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());

        let error = build(options, Config::default(), client).unwrap_err();
        assert!(error.to_string().contains("Undefined preset: timesketch"));
    }
}
