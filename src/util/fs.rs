//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use regex::Regex;

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy a single file.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Move a file, falling back to copy and remove across filesystems.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    copy_file(src, dst)?;
    fs::remove_file(src).with_context(|| format!("failed to remove file: {}", src.display()))
}

/// Mark a file as executable by its owner, group and others.
#[cfg(unix)]
pub fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .with_context(|| format!("failed to stat file: {}", path.display()))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("failed to chmod file: {}", path.display()))
}

#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Find files and directories matching a glob pattern relative to a base
/// directory. Glob metacharacters in the base directory match literally.
pub fn glob_paths(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped_base = PathBuf::from(glob::Pattern::escape(&base.to_string_lossy()));
    let full_pattern = escaped_base.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let mut results = Vec::new();
    for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
    {
        match entry {
            Ok(path) => results.push(path),
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    results.sort();
    Ok(results)
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        results.extend(
            glob_paths(base, pattern)?
                .into_iter()
                .filter(|path| path.is_file()),
        );
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Remove everything in `base` that matches one of the glob patterns unless
/// its file name matches `keep`.
///
/// Permission errors are logged and the remaining entries are still
/// processed. Other filesystem errors are returned.
pub fn remove_stale(base: &Path, patterns: &[String], keep: &Regex) -> Result<()> {
    for pattern in patterns {
        for path in glob_paths(base, pattern)? {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            if keep.is_match(&file_name) {
                continue;
            }

            remove_path(&path)?;
        }
    }
    Ok(())
}

/// Remove a file or directory tree, logging permission errors.
pub fn remove_path(path: &Path) -> Result<()> {
    tracing::info!("Removing: {}", file_name_or_path(path));

    let result = if path.is_dir() && !path.is_symlink() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            tracing::warn!("Unable to remove: {}: {}", path.display(), e);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("failed to remove: {}", path.display())),
    }
}

fn file_name_or_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("dfvfs-20240101-py3-none-any.whl"), "").unwrap();
        fs::write(dist.join("dfvfs-20240101.tar.gz"), "").unwrap();

        let files = glob_files(tmp.path(), &["dist/*.whl".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_glob_paths_with_brackets_in_base() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("build[1]");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("zlib-1.2.11.tar.gz"), "").unwrap();

        let paths = glob_paths(&base, "zlib-*.tar.gz").unwrap();
        assert_eq!(paths, vec![base.join("zlib-1.2.11.tar.gz")]);
    }

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("dpkg");
        let dst = tmp.path().join("debian");

        fs::create_dir_all(src.join("source")).unwrap();
        fs::write(src.join("compat"), "10").unwrap();
        fs::write(src.join("source").join("format"), "3.0 (quilt)").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("compat")).unwrap(), "10");
        assert!(dst.join("source").join("format").exists());
    }

    #[test]
    fn test_remove_stale_keeps_current_version() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("libyal-20200101.tar.gz"), "").unwrap();
        fs::write(tmp.path().join("libyal-20210101.tar.gz"), "").unwrap();
        fs::create_dir(tmp.path().join("libyal-20200101")).unwrap();

        let keep = Regex::new("^libyal-.*20210101").unwrap();
        let patterns = vec!["libyal-[0-9]*".to_string()];
        remove_stale(tmp.path(), &patterns, &keep).unwrap();

        assert!(!tmp.path().join("libyal-20200101.tar.gz").exists());
        assert!(!tmp.path().join("libyal-20200101").exists());
        assert!(tmp.path().join("libyal-20210101.tar.gz").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_set_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let rules = tmp.path().join("rules");
        fs::write(&rules, "#!/usr/bin/make -f\n").unwrap();

        set_executable(&rules).unwrap();

        let mode = fs::metadata(&rules).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
