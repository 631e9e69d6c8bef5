//! `l2tdevtools build` command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::BuildArgs;
use crate::commands::data_directory;
use l2tdevtools::ops::{build, BuildOptions, Target};
use l2tdevtools::util::config::load_for;
use l2tdevtools::util::url_lib::ReqwestClient;

/// Build directory when neither the flag nor the config sets one.
const DEFAULT_BUILD_DIRECTORY: &str = "../l2tbuilds";

pub fn execute(args: BuildArgs) -> Result<()> {
    let target: Target = args
        .target
        .parse()
        .with_context(|| format!("invalid target: {}", args.target))?;

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let config = load_for(&cwd);

    let config_directory = data_directory(args.config, &config, &cwd);
    let build_directory = args
        .build_directory
        .or_else(|| config.build.build_directory.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIRECTORY));
    let downloads_directory = args
        .download_directory
        .or_else(|| config.build.downloads_directory.clone());

    let client = Arc::new(ReqwestClient::new(&config.net)?);

    let options = BuildOptions {
        target,
        build_directory,
        config_directory,
        distributions: args.distributions,
        downloads_directory,
        preset: args.preset,
        projects: args.projects,
    };

    let summary = build(options, config, client)?;
    print!("{}", summary);

    if !summary.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
