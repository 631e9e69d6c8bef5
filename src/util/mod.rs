//! Shared utilities

pub mod config;
pub mod fs;
pub mod ini;
pub mod process;
pub mod template;
pub mod url_lib;

pub use config::Config;
pub use process::ProcessBuilder;
pub use url_lib::{HttpClient, ReqwestClient};
