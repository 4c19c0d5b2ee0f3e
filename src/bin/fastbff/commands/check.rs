//! `fastbff check` command

use std::sync::Arc;

use anyhow::Result;

use super::{load, report, GlobalArgs};
use crate::cli::CheckArgs;
use fastbff::ops::check::check;
use fastbff::util::shell::Status;

pub fn execute(args: CheckArgs, global: &GlobalArgs) -> Result<()> {
    let shell = Arc::new(global.shell(false));
    let loaded = load(&args.manifest)?;

    let span = shell.span(Status::Checking, loaded.manifest.display());
    let summary = check(&loaded.workspace, &loaded.config, loaded.strategy)
        .map_err(|e| report(&shell, e.into()))?;

    for gap in &summary.skipped {
        shell.status(Status::Skipped, gap);
    }
    span.finish_with_message(format!(
        "{} projects, {} configurations, {} unity files, {} files would be generated",
        summary.projects, summary.configurations, summary.unity_files, summary.files
    ));

    Ok(())
}
