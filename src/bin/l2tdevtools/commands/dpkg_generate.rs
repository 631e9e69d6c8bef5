//! `l2tdevtools dpkg-generate` command

use anyhow::{Context, Result};

use crate::cli::DpkgGenerateArgs;
use crate::commands::data_directory;
use l2tdevtools::ops::{dpkg_generate, DpkgGenerateOptions};
use l2tdevtools::util::config::load_for;

pub fn execute(args: DpkgGenerateArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let config = load_for(&cwd);

    let data_path = data_directory(None, &config, &cwd);
    let config_file = match args.config_file {
        Some(path) => cwd.join(path),
        None => data_path.join("projects.ini"),
    };

    let options = DpkgGenerateOptions {
        project_name: args.project_name,
        config_file,
        data_path,
        source_directory: args.source_directory,
    };

    let result = dpkg_generate(&options, &cwd)?;
    println!("Generated: {}", result.dpkg_path.display());

    Ok(())
}
