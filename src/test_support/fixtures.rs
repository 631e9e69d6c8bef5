//! Test fixtures for common test scenarios.
//!
//! Provides definition files in the format of the configuration directory
//! and helpers to create source packages on disk.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

/// A `projects.ini` with a Python project, a library and zlib.
pub const PROJECTS_INI: &str = "\
# Project definitions

[dfvfs]
build_system: setup_py
description_short: Digital Forensics Virtual File System
description_long: dfVFS provides read-only access to file-system objects
    from various storage media types and file formats.
download_url: https://github.com/log2timeline/dfvfs/releases
dpkg_dependencies: python3-dfdatetime,python3-six
homepage_url: https://github.com/log2timeline/dfvfs
maintainer: Joachim Metz <joachim.metz@gmail.com>
version: >=20150409

[libyal]
architecture_dependent: true
build_dependencies: zlib,bzip2
build_system: configure_make
download_url: https://github.com/libyal/libyal/releases
git_url: https://github.com/libyal/libyal.git

[zlib]
build_system: configure_make
download_url: http://www.zlib.net
disabled: dpkg,rpm
";

/// A `dependencies.ini` exercising the package name mappings.
pub const DEPENDENCIES_INI: &str = "\
[six]
dpkg_name: python-six
minimum_version: 1.1.0
rpm_name: python2-six
version_property: __version__

[dfdatetime]
dpkg_name: python3-dfdatetime
minimum_version: 20180110
rpm_name: python3-dfdatetime
version_property: __version__

[pysqlite2]
dpkg_name: python-pysqlite2
pypi_name: pysqlite

[yaml]
dpkg_name: python3-yaml
l2tbinaries_macos_name: PyYAML
l2tbinaries_name: pyyaml
maximum_version: 5.4
minimum_version: 3.10
pypi_name: PyYAML
python3_only: true
rpm_name: python3-yaml
version_property: __version__
";

/// A `test_dependencies.ini` that overlaps with [`DEPENDENCIES_INI`].
pub const TEST_DEPENDENCIES_INI: &str = "\
[mock]
dpkg_name: python3-mock
minimum_version: 2.0.0
rpm_name: python3-mock
version_property: __version__

[six]
dpkg_name: python-six
minimum_version: 1.1.0
rpm_name: python2-six
version_property: __version__
";

/// A `presets.ini` with a populated, an empty and a nested preset.
pub const PRESETS_INI: &str = "\
[dfvfs]
projects: dfvfs,libyal,zlib

[empty]

[plaso]
presets: dfvfs
projects: plaso
";

/// Write a `.tar.gz` archive with the given files (path and content).
pub fn create_tar_gz(path: &Path, files: &[(&str, &str)]) -> PathBuf {
    let file = File::create(path).expect("failed to create archive");
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(1_500_000_000);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("failed to append to archive");
    }

    builder
        .into_inner()
        .expect("failed to finish archive")
        .finish()
        .expect("failed to finish compression");
    path.to_path_buf()
}

/// Write a `.zip` archive with the given files (path and content).
///
/// Entries ending in `/` are added as directories.
pub fn create_zip(path: &Path, files: &[(&str, &str)]) -> PathBuf {
    let file = File::create(path).expect("failed to create archive");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in files {
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .expect("failed to add directory");
        } else {
            writer.start_file(*name, options).expect("failed to add file");
            writer
                .write_all(content.as_bytes())
                .expect("failed to write file");
        }
    }

    writer.finish().expect("failed to finish archive");
    path.to_path_buf()
}
