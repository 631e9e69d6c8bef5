//! Build helpers.
//!
//! A build helper turns an extracted project source into the packages of
//! one format: dpkg, rpm, msi, pkg, wheel or an osc commit.

pub mod dpkg;
pub mod helper;
pub mod msi;
pub mod osc;
pub mod pkg;
pub mod registry;
pub mod rpm;
pub mod source;
pub mod wheel;

pub use helper::{BuildContext, BuildError, BuildHelper, LOG_FILENAME};
pub use registry::{detect_build_system, new_build_helper, BuildTarget};
