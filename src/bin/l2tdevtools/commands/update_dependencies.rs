//! `l2tdevtools update-dependencies` command

use anyhow::{Context, Result};

use crate::cli::UpdateDependenciesArgs;
use crate::commands::data_directory;
use l2tdevtools::ops::{update_dependencies, UpdateDependenciesOptions};
use l2tdevtools::util::config::load_for;

pub fn execute(args: UpdateDependenciesArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let config = load_for(&cwd);

    let options = UpdateDependenciesOptions {
        project_path: cwd.join(args.project_path),
        data_path: data_directory(None, &config, &cwd),
        project_file: args.project_file.map(|path| cwd.join(path)),
    };

    for path in update_dependencies(&options)? {
        println!("Updated: {}", path.display());
    }

    Ok(())
}
