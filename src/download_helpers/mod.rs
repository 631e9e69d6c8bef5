//! Download helpers.
//!
//! A download helper resolves the latest acceptable version of an upstream
//! project from its release page and downloads the source package.

pub mod factory;
pub mod github;
pub mod interface;
pub mod project;
pub mod pypi;
pub mod sourceforge;
pub mod zlib;

pub use factory::new_download_helper;
pub use interface::{DownloadHelper, PageDownloader};
pub use zlib::ZlibDownloadHelper;
