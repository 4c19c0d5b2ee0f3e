//! Command implementations

pub mod check;
pub mod completions;
pub mod generate;
pub mod targets;

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::cli::ManifestArgs;
use fastbff::core::manifest::load_workspace;
use fastbff::core::Workspace;
use fastbff::generator::events::GenerateEvent;
use fastbff::generator::{GenerateError, UnityNamingStrategy};
use fastbff::util::diagnostic;
use fastbff::util::shell::{ColorChoice, Shell};
use fastbff::util::{Config, GlobalContext};

/// Flags shared by every command.
pub struct GlobalArgs {
    pub verbose: bool,
    pub quiet: bool,
    pub color: ColorChoice,
}

impl GlobalArgs {
    pub fn shell(&self, json: bool) -> Shell {
        Shell::from_flags(self.quiet, self.verbose, self.color, json)
    }
}

/// A loaded description with its configuration.
pub struct Loaded {
    pub manifest: PathBuf,
    pub workspace: Workspace,
    pub config: Config,
    pub strategy: UnityNamingStrategy,
}

/// Locate and load the description; CLI flags override the config files.
pub fn load(args: &ManifestArgs) -> Result<Loaded> {
    let ctx = GlobalContext::new()?;
    let manifest = ctx.find_manifest(args.manifest.as_deref())?;
    let config = ctx.load_config(&manifest);

    let strategy = match &args.unity_naming {
        Some(s) => s.parse().map_err(|e| anyhow!("{}", e))?,
        None => config.unity_naming().unwrap_or_default(),
    };
    let workspace = load_workspace(&manifest)?;

    Ok(Loaded {
        manifest,
        workspace,
        config,
        strategy,
    })
}

/// Report a generation error through the shell and return the error ending the run.
pub fn report(shell: &Shell, err: anyhow::Error) -> anyhow::Error {
    let Some(failure) = err.downcast_ref::<GenerateError>() else {
        return err;
    };

    if shell.is_json() {
        shell.json_event(&GenerateEvent::error(failure.to_string()).to_value());
    } else {
        diagnostic::emit(&failure.to_diagnostic(), shell.use_color());
        if let GenerateError::Graph(graph) = failure {
            if let Some(cycle) = graph.cycle_report() {
                if shell.is_verbose() {
                    eprintln!("{:?}", miette::Report::new(cycle));
                }
            }
        }
    }
    anyhow!("generation failed")
}
