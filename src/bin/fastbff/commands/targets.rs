//! `fastbff targets` command

use anyhow::{Context, Result};

use super::{load, GlobalArgs};
use crate::cli::TargetsArgs;
use fastbff::generator::GenerationCache;
use fastbff::ops::targets::list_targets;

pub fn execute(args: TargetsArgs, _global: &GlobalArgs) -> Result<()> {
    let loaded = load(&args.manifest)?;
    let cache = GenerationCache::new();
    let lines = list_targets(&loaded.workspace, &loaded.config, &cache, args.rebuild);

    if args.json {
        let json = serde_json::to_string_pretty(&lines).context("failed to serialize targets")?;
        println!("{}", json);
        return Ok(());
    }

    let width = lines.iter().map(|l| l.short_name.len()).max().unwrap_or(0);
    for line in &lines {
        println!("{:<width$}  {}", line.short_name, line.command, width = width);
    }

    Ok(())
}
