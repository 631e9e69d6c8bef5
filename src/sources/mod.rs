//! Project sources.
//!
//! Source helpers provide the source directory a build helper works in,
//! either extracted from a downloaded source package or cloned from git.

pub mod archive;
pub mod git;
pub mod package;
pub mod source;

pub use git::{GitRepositorySourceHelper, LibyalGitRepositorySourceHelper};
pub use package::SourcePackageHelper;
pub use source::SourceHelper;
