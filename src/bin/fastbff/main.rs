//! fastbff CLI - FASTBuild file generation

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
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("fastbff=debug")
    } else if cli.quiet {
        EnvFilter::new("fastbff=error")
    } else {
        EnvFilter::new("fastbff=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let global = commands::GlobalArgs {
        verbose: cli.verbose,
        quiet: cli.quiet,
        color: cli.color.parse().map_err(|e| anyhow::anyhow!("{}", e))?,
    };

    // Execute command
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &global),
        Commands::Check(args) => commands::check::execute(args, &global),
        Commands::Targets(args) => commands::targets::execute(args, &global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
