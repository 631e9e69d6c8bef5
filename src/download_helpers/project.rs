//! Version selection shared by the project download helpers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::{ProjectVersionDefinition, VersionClause, VersionOperator};

/// Versions found on a release page, in the order they were found.
///
/// Each entry maps the version as written to its numeric parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableVersions {
    versions: Vec<(String, Vec<u64>)>,
}

impl AvailableVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version. A version string seen before is replaced in place.
    pub fn insert(&mut self, version: impl Into<String>, parts: Vec<u64>) {
        let version = version.into();
        match self.versions.iter_mut().find(|(v, _)| *v == version) {
            Some(entry) => entry.1 = parts,
            None => self.versions.push((version, parts)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Select the highest version that satisfies the constraints.
    ///
    /// With `with_epoch` the first element of every tuple is an epoch that
    /// does not take part in the comparison.
    pub fn latest(
        &self,
        earliest_version: Option<&VersionClause>,
        latest_version: Option<&VersionClause>,
        with_epoch: bool,
    ) -> Option<String> {
        let mut latest_match: Option<(&str, &[u64])> = None;

        for (version, parts) in &self.versions {
            let parts = if with_epoch && !parts.is_empty() {
                &parts[1..]
            } else {
                parts.as_slice()
            };

            if let Some(earliest) = earliest_version {
                let accepted = match earliest.operator {
                    VersionOperator::Greater
                    | VersionOperator::GreaterEqual
                    | VersionOperator::Equal => earliest.matches(parts),
                    _ => true,
                };
                if !accepted {
                    continue;
                }
            }

            if let Some(latest) = latest_version {
                let accepted = match latest.operator {
                    VersionOperator::Less | VersionOperator::LessEqual => latest.matches(parts),
                    _ => true,
                };
                if !accepted {
                    continue;
                }
            }

            match latest_match {
                Some((_, best)) if parts <= best => {}
                _ => latest_match = Some((version, parts)),
            }
        }

        latest_match.map(|(version, _)| version.to_string())
    }
}

/// The pinned version of an `==` constraint, if any.
pub fn pinned_version(version_definition: Option<&ProjectVersionDefinition>) -> Option<String> {
    let earliest = version_definition?.earliest_version()?;
    (earliest.operator == VersionOperator::Equal).then(|| earliest.version())
}

/// Rename a GitHub archive (`{v}.tar.gz`, `release-{v}.tar.gz` or
/// `v{v}.tar.gz`) to `{project}-{v}.tar.gz`.
pub fn normalize_archive_filename(
    path: &Path,
    project_name: &str,
    project_version: &str,
) -> Result<PathBuf> {
    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        return Ok(path.to_path_buf());
    };

    let archive_names = [
        format!("{}.tar.gz", project_version),
        format!("release-{}.tar.gz", project_version),
        format!("v{}.tar.gz", project_version),
    ];
    if !archive_names.iter().any(|name| name == filename) {
        return Ok(path.to_path_buf());
    }

    let package_path = path.with_file_name(format!("{}-{}.tar.gz", project_name, project_version));
    if package_path.exists() {
        std::fs::remove_file(&package_path)
            .with_context(|| format!("failed to remove file: {}", package_path.display()))?;
    }

    std::fs::rename(path, &package_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            path.display(),
            package_path.display()
        )
    })?;

    Ok(package_path)
}
