//! Source package archives: extraction and `.orig.tar.gz` creation.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Archive formats a source package can come in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    TarBz2,
    Zip,
}

impl ArchiveKind {
    /// Determine the archive kind from the file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.bz2") {
            Some(ArchiveKind::TarBz2)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }
}

/// Tracks the top-level directory an archive extracts into.
///
/// The first member defines it; later members outside it are skipped.
struct TopLevelDirectory<'a> {
    archive: &'a Path,
    destination: &'a Path,
    name: Option<String>,
}

enum MemberAction {
    Extract,
    Skip,
    /// The directory exists, nothing needs to be extracted.
    Done,
    Refuse,
}

impl<'a> TopLevelDirectory<'a> {
    fn new(archive: &'a Path, destination: &'a Path) -> Self {
        TopLevelDirectory {
            archive,
            destination,
            name: None,
        }
    }

    fn check(&mut self, member: &str) -> MemberAction {
        let first_component = member.split('/').next().unwrap_or_default();

        match &self.name {
            None => {
                if first_component.is_empty() || first_component.starts_with("..") {
                    tracing::error!(
                        "Unsupported directory name in archive: {}",
                        self.archive.display()
                    );
                    return MemberAction::Refuse;
                }

                self.name = Some(first_component.to_string());
                if self.destination.join(first_component).exists() {
                    return MemberAction::Done;
                }

                tracing::info!("Extracting: {}", self.archive.display());
                MemberAction::Extract
            }
            Some(name) if name == first_component => MemberAction::Extract,
            Some(_) => {
                tracing::warn!("Skipping: {} in archive: {}", member, self.archive.display());
                MemberAction::Skip
            }
        }
    }
}

/// Extract a source package into `destination`.
///
/// Returns the name of the top-level directory, or `None` if the archive
/// layout is not supported. An already extracted directory is left as is.
pub fn extract(archive: &Path, destination: &Path) -> Result<Option<String>> {
    let Some(kind) = ArchiveKind::from_path(archive) else {
        tracing::warn!("Unsupported source package: {}", archive.display());
        return Ok(None);
    };

    let file = File::open(archive)
        .with_context(|| format!("failed to open source package: {}", archive.display()))?;
    let reader = BufReader::new(file);

    match kind {
        ArchiveKind::TarGz => extract_tar(GzDecoder::new(reader), archive, destination),
        ArchiveKind::TarBz2 => {
            extract_tar(bzip2::read::BzDecoder::new(reader), archive, destination)
        }
        ArchiveKind::Zip => extract_zip(reader, archive, destination),
    }
}

fn extract_tar<R: Read>(reader: R, archive: &Path, destination: &Path) -> Result<Option<String>> {
    let mut tar = tar::Archive::new(reader);
    let mut top_level = TopLevelDirectory::new(archive, destination);

    let entries = tar
        .entries()
        .with_context(|| format!("failed to read tar file: {}", archive.display()))?;

    for entry in entries {
        let mut entry =
            entry.with_context(|| format!("failed to read tar file: {}", archive.display()))?;

        let member = match entry.path() {
            Ok(path) => match path.to_str() {
                Some(name) => name.to_string(),
                None => {
                    tracing::warn!("Unable to decode filename in tar file: {}", archive.display());
                    continue;
                }
            },
            Err(_) => {
                tracing::warn!("Missing filename in tar file: {}", archive.display());
                continue;
            }
        };

        match top_level.check(&member) {
            MemberAction::Extract => {}
            MemberAction::Skip => continue,
            MemberAction::Done => break,
            MemberAction::Refuse => return Ok(None),
        }

        // unpack_in refuses members that would escape the destination.
        if !entry
            .unpack_in(destination)
            .with_context(|| format!("failed to extract: {}", member))?
        {
            tracing::warn!("Skipping: {} in tar file: {}", member, archive.display());
        }
    }

    Ok(top_level.name)
}

fn extract_zip<R: Read + io::Seek>(
    reader: R,
    archive: &Path,
    destination: &Path,
) -> Result<Option<String>> {
    let mut zip = zip::ZipArchive::new(reader)
        .with_context(|| format!("failed to read zip file: {}", archive.display()))?;
    let mut top_level = TopLevelDirectory::new(archive, destination);

    for index in 0..zip.len() {
        let mut file = zip
            .by_index(index)
            .with_context(|| format!("failed to read zip file: {}", archive.display()))?;
        let member = file.name().to_string();

        match top_level.check(&member) {
            MemberAction::Extract => {}
            MemberAction::Skip => continue,
            MemberAction::Done => break,
            MemberAction::Refuse => return Ok(None),
        }

        let Some(relative_path) = file.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!("Skipping: {} in zip file: {}", member, archive.display());
            continue;
        };
        let path = destination.join(relative_path);

        if file.is_dir() {
            std::fs::create_dir_all(&path)
                .with_context(|| format!("failed to create directory: {}", path.display()))?;
            continue;
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let mut output = File::create(&path)
            .with_context(|| format!("failed to create file: {}", path.display()))?;
        io::copy(&mut file, &mut output)
            .with_context(|| format!("failed to extract: {}", member))?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode & 0o777))?;
        }
    }

    Ok(top_level.name)
}

/// Seconds since the epoch of a zip timestamp, 0 if it is invalid.
fn zip_timestamp(date_time: zip::DateTime) -> u64 {
    NaiveDate::from_ymd_opt(
        i32::from(date_time.year()),
        u32::from(date_time.month()),
        u32::from(date_time.day()),
    )
    .and_then(|date| {
        date.and_hms_opt(
            u32::from(date_time.hour()),
            u32::from(date_time.minute()),
            u32::from(date_time.second()),
        )
    })
    .map(|date_time| date_time.and_utc().timestamp().max(0) as u64)
    .unwrap_or(0)
}

/// Repackage a `.zip` source package as a `.tar.gz`.
///
/// Directories get mode 0755 and files 0644; modification times are
/// taken from the zip entries.
pub fn zip_to_tar_gz(zip_path: &Path, tar_gz_path: &Path) -> Result<()> {
    let file = File::open(zip_path)
        .with_context(|| format!("failed to open zip file: {}", zip_path.display()))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("failed to read zip file: {}", zip_path.display()))?;

    let output = File::create(tar_gz_path)
        .with_context(|| format!("failed to create file: {}", tar_gz_path.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(output, Compression::default()));

    for index in 0..zip.len() {
        let file = zip.by_index(index)?;
        let name = file.name().to_string();

        let mut header = tar::Header::new_gnu();
        header.set_mtime(zip_timestamp(file.last_modified()));

        if file.is_dir() {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            header.set_cksum();
            builder.append_data(&mut header, &name, io::empty())?;
        } else {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(file.size());
            header.set_cksum();
            builder.append_data(&mut header, &name, file)?;
        }
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .with_context(|| format!("failed to write: {}", tar_gz_path.display()))?;

    Ok(())
}
