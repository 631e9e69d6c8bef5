//! Source code from a git repository.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::Repository;
use url::Url;

use crate::core::ProjectDefinition;
use crate::sources::source::SourceHelper;
use crate::util::fs::remove_path;
use crate::util::process::ProcessBuilder;

/// Name of the directory `git clone` creates for a repository URL.
fn checkout_directory_name(git_url: &str) -> Option<String> {
    let last_segment = match Url::parse(git_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        // scp-like `git@host:org/repo.git` and local paths
        Err(_) => git_url
            .trim_end_matches('/')
            .rsplit(['/', ':'])
            .next()
            .map(str::to_string),
    }?;

    let name = last_segment.strip_suffix(".git").unwrap_or(&last_segment);
    (!name.is_empty()).then(|| name.to_string())
}

/// Manages the source code of a project from its git repository.
#[derive(Debug)]
pub struct GitRepositorySourceHelper {
    project_name: String,
    git_url: Option<String>,
    build_directory: PathBuf,
    source_directory_path: Option<PathBuf>,
}

impl GitRepositorySourceHelper {
    pub fn new(definition: &ProjectDefinition, build_directory: impl Into<PathBuf>) -> Self {
        GitRepositorySourceHelper {
            project_name: definition.name.clone(),
            git_url: definition.git_url.clone(),
            build_directory: build_directory.into(),
            source_directory_path: None,
        }
    }

    fn checkout_path(&self) -> PathBuf {
        let name = self
            .git_url
            .as_deref()
            .and_then(checkout_directory_name)
            .unwrap_or_else(|| self.project_name.clone());
        self.build_directory.join(name)
    }

    fn clone_repository(&mut self) -> Result<Option<PathBuf>> {
        let Some(git_url) = self.git_url.as_deref().filter(|url| !url.is_empty()) else {
            tracing::warn!("Missing git URL of: {}", self.project_name);
            return Ok(None);
        };
        if self.project_name.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.build_directory).with_context(|| {
            format!("failed to create directory: {}", self.build_directory.display())
        })?;

        let checkout_path = self.checkout_path();
        tracing::info!("Cloning: {}", git_url);

        if let Err(e) = Repository::clone(git_url, &checkout_path) {
            tracing::error!("Running: \"git clone {}\" failed: {}", git_url, e);
            return Ok(None);
        }

        self.source_directory_path = Some(checkout_path.clone());
        Ok(Some(checkout_path))
    }
}

impl SourceHelper for GitRepositorySourceHelper {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    /// A checkout has no release version.
    fn project_version(&mut self) -> Option<String> {
        None
    }

    /// Remove a previous checkout.
    fn clean(&mut self) -> Result<()> {
        let checkout_path = self.checkout_path();
        if checkout_path.exists() {
            remove_path(&checkout_path)?;
        }
        self.source_directory_path = None;
        Ok(())
    }

    fn create(&mut self) -> Result<Option<PathBuf>> {
        self.clone_repository()
    }

    fn source_directory_path(&self) -> Option<&Path> {
        self.source_directory_path.as_deref()
    }

    fn source_package_path(&mut self) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    fn project_identifier(&self) -> Option<String> {
        None
    }
}

/// Git source of a libyal project, prepared with `synclibs.sh`,
/// `autogen.sh` and `configure` after cloning.
#[derive(Debug)]
pub struct LibyalGitRepositorySourceHelper {
    repository: GitRepositorySourceHelper,
}

impl LibyalGitRepositorySourceHelper {
    pub fn new(definition: &ProjectDefinition, build_directory: impl Into<PathBuf>) -> Self {
        LibyalGitRepositorySourceHelper {
            repository: GitRepositorySourceHelper::new(definition, build_directory),
        }
    }
}

impl SourceHelper for LibyalGitRepositorySourceHelper {
    fn project_name(&self) -> &str {
        self.repository.project_name()
    }

    fn project_version(&mut self) -> Option<String> {
        self.repository.project_version()
    }

    fn clean(&mut self) -> Result<()> {
        self.repository.clean()
    }

    fn create(&mut self) -> Result<Option<PathBuf>> {
        let Some(source_directory) = self.repository.create()? else {
            return Ok(None);
        };

        for script in ["./synclibs.sh", "./autogen.sh", "./configure"] {
            if !ProcessBuilder::new("sh").arg(script).cwd(&source_directory).run() {
                self.repository.source_directory_path = None;
                return Ok(None);
            }
        }

        Ok(Some(source_directory))
    }

    fn source_directory_path(&self) -> Option<&Path> {
        self.repository.source_directory_path()
    }

    fn source_package_path(&mut self) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    fn project_identifier(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Create a repository with the given files in a single commit.
    fn create_repository(path: &Path, files: &[(&str, &str)]) {
        let repository = Repository::init(path).unwrap();
        for (name, content) in files {
            std::fs::write(path.join(name), content).unwrap();
        }

        let mut index = repository.index().unwrap();
        for (name, _) in files {
            index.add_path(Path::new(name)).unwrap();
        }
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repository.find_tree(tree_id).unwrap();
        let signature = git2::Signature::now("Test", "test@example.com").unwrap();
        repository
            .commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
            .unwrap();
    }

    fn definition(name: &str, git_url: &Path) -> ProjectDefinition {
        let mut definition = ProjectDefinition::new(name);
        definition.git_url = Some(git_url.to_string_lossy().into_owned());
        definition
    }

    #[test]
    fn test_checkout_directory_name() {
        assert_eq!(
            checkout_directory_name("https://github.com/libyal/libbde.git").as_deref(),
            Some("libbde")
        );
        assert_eq!(
            checkout_directory_name("https://github.com/log2timeline/plaso/").as_deref(),
            Some("plaso")
        );
        assert_eq!(
            checkout_directory_name("git@github.com:libyal/libewf.git").as_deref(),
            Some("libewf")
        );
    }

    #[test]
    fn test_clone_and_clean() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream").join("dfvfs");
        std::fs::create_dir_all(&upstream).unwrap();
        create_repository(&upstream, &[("setup.py", "setup()")]);

        let build = tmp.path().join("build");
        let mut helper = GitRepositorySourceHelper::new(&definition("dfvfs", &upstream), &build);

        let source_directory = helper.create().unwrap().unwrap();
        assert_eq!(source_directory, build.join("dfvfs"));
        assert!(source_directory.join("setup.py").exists());
        assert!(helper.project_identifier().is_none());
        assert!(helper.source_package_path().unwrap().is_none());

        helper.clean().unwrap();
        assert!(!source_directory.exists());
        assert!(helper.source_directory_path().is_none());
    }

    #[test]
    fn test_clone_failure() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        let mut helper =
            GitRepositorySourceHelper::new(&definition("missing", &missing), tmp.path().join("build"));

        assert!(helper.create().unwrap().is_none());

        let mut helper = GitRepositorySourceHelper::new(&ProjectDefinition::new("plain"), tmp.path());
        assert!(helper.create().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_libyal_prepare() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream").join("libfoo");
        std::fs::create_dir_all(&upstream).unwrap();
        create_repository(
            &upstream,
            &[
                ("synclibs.sh", "touch synclibs.done\n"),
                ("autogen.sh", "touch autogen.done\n"),
                ("configure", "touch configure.done\n"),
            ],
        );

        let build = tmp.path().join("build");
        let mut helper = LibyalGitRepositorySourceHelper::new(&definition("libfoo", &upstream), &build);
        let source_directory = helper.create().unwrap().unwrap();

        for name in ["synclibs.done", "autogen.done", "configure.done"] {
            assert!(source_directory.join(name).exists(), "missing {}", name);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_libyal_prepare_failure() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream").join("libbar");
        std::fs::create_dir_all(&upstream).unwrap();
        create_repository(&upstream, &[("synclibs.sh", "exit 1\n")]);

        let mut helper =
            LibyalGitRepositorySourceHelper::new(&definition("libbar", &upstream), tmp.path().join("build"));
        assert!(helper.create().unwrap().is_none());
        assert!(helper.source_directory_path().is_none());
    }
}
