//! l2tdevtools CLI - builds and packages the log2timeline projects

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("l2tdevtools=debug")
    } else {
        EnvFilter::new("l2tdevtools=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::DpkgGenerate(args) => commands::dpkg_generate::execute(args),
        Commands::UpdateDependencies(args) => commands::update_dependencies::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
