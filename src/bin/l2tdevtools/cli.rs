//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// l2tdevtools - build and packaging tools for the log2timeline projects
#[derive(Parser)]
#[command(name = "l2tdevtools")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and build projects
    Build(BuildArgs),

    /// Generate the dpkg packaging files of a project
    DpkgGenerate(DpkgGenerateArgs),

    /// Regenerate requirements.txt and test_requirements.txt
    UpdateDependencies(UpdateDependenciesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// What to build: download, dpkg, dpkg-source, msi, osc, pkg, rpm,
    /// source, srpm or wheel
    pub target: String,

    /// Directory to build in
    #[arg(long, visible_alias = "build-dir", alias = "build_directory")]
    pub build_directory: Option<PathBuf>,

    /// Directory with projects.ini and presets.ini
    #[arg(short, long = "config", value_name = "DIR")]
    pub config: Option<PathBuf>,

    /// Comma separated list of distributions to build dpkg-source packages
    /// for
    #[arg(long, value_delimiter = ',')]
    pub distributions: Vec<String>,

    /// Directory to download source packages to
    #[arg(long, visible_alias = "download-dir", alias = "download_directory")]
    pub download_directory: Option<PathBuf>,

    /// Name of the preset of projects to build
    #[arg(long)]
    pub preset: Option<String>,

    /// Comma separated list of projects to build
    #[arg(long, value_delimiter = ',')]
    pub projects: Vec<String>,
}

#[derive(Args)]
pub struct DpkgGenerateArgs {
    /// Name of the project
    pub project_name: String,

    /// Path of projects.ini
    #[arg(short, long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Source directory of the project
    #[arg(long, alias = "source-dir")]
    pub source_directory: Option<PathBuf>,
}

#[derive(Args)]
pub struct UpdateDependenciesArgs {
    /// Directory of the project
    #[arg(long, default_value = ".")]
    pub project_path: PathBuf,

    /// Project configuration file, defaults to {project name}.ini in the
    /// project directory
    #[arg(long, value_name = "FILE")]
    pub project_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
