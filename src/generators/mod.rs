//! Generators of packaging files: debian packaging directories and RPM
//! spec files.

pub mod dpkg_files;
pub mod spec_file;

pub use dpkg_files::{DpkgBuildConfiguration, DpkgBuildFilesGenerator};
pub use spec_file::{split_requires, RpmSpecFileGenerator, SpecFileError};
