//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell as CompletionShell;

/// fastbff - FASTBuild .bff generation for multi-platform C/C++ solutions
#[derive(Parser)]
#[command(name = "fastbff")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate project, master and global settings files
    Generate(GenerateArgs),

    /// Run every generation phase without writing files
    Check(CheckArgs),

    /// List configurations and their fbuild command lines
    Targets(TargetsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Output format for machine consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MessageFormat {
    #[default]
    Human,
    Json,
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Path to the description file (defaults to the nearest FastBff.toml)
    #[arg(long, env = "FASTBFF_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Unity naming strategy: hash, fragment, fragment-hash
    #[arg(long)]
    pub unity_naming: Option<String>,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Generate everything but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Write the list of generated files to this JSON file
    #[arg(long)]
    pub emit_outputs: Option<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
}

#[derive(Args)]
pub struct TargetsArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Show the rebuild (-clean) command lines
    #[arg(long)]
    pub rebuild: bool,

    /// Print the list as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
