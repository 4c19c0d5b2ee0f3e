//! `fastbff generate` command

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use super::{load, report, GlobalArgs};
use crate::cli::{GenerateArgs, MessageFormat};
use fastbff::generator::events::GenerateEvent;
use fastbff::ops::generate::{generate, FileOutcome, GenerateOptions};
use fastbff::util::shell::Status;

pub fn execute(args: GenerateArgs, global: &GlobalArgs) -> Result<()> {
    let shell = Arc::new(global.shell(args.message_format == MessageFormat::Json));
    let start = Instant::now();

    let loaded = load(&args.manifest)?;
    let ws = &loaded.workspace;
    shell.json_event(
        &GenerateEvent::started(
            &loaded.manifest,
            ws.projects().len() as u64,
            loaded.strategy.as_str(),
        )
        .to_value(),
    );

    let span = shell.span(
        Status::Generating,
        format!(
            "{} ({} unity naming)",
            loaded.manifest.display(),
            loaded.strategy
        ),
    );

    let opts = GenerateOptions {
        unity_naming: loaded.strategy,
        dry_run: args.dry_run,
        emit_outputs: args.emit_outputs,
        jobs: args.jobs,
    };

    let result = match generate(ws, &loaded.config, &opts, &shell) {
        Ok(result) => result,
        Err(e) => {
            let elapsed = start.elapsed().as_millis() as u64;
            shell.json_event(&GenerateEvent::finished(false, elapsed, None).to_value());
            return Err(report(&shell, e));
        }
    };

    for gap in &result.skipped {
        shell.status(Status::Skipped, gap);
        shell.json_event(
            &GenerateEvent::skipped(&gap.configuration, &gap.platform, &gap.reason).to_value(),
        );
    }

    for (path, outcome) in &result.files {
        let status = match outcome {
            FileOutcome::Updated => Status::Updated,
            FileOutcome::Unchanged => Status::Unchanged,
            FileOutcome::DryRun => Status::Generated,
        };
        shell.status(status, path.display());
        shell.json_event(&GenerateEvent::file_written(path, outcome.as_str()).to_value());
    }

    if let Some(outputs) = &result.outputs_manifest {
        shell.note(format!("outputs listed in {}", outputs.display()));
    }

    let updated = result.updated();
    shell.json_event(
        &GenerateEvent::finished(
            true,
            start.elapsed().as_millis() as u64,
            Some(updated as u64),
        )
        .to_value(),
    );
    span.finish_with_message(format!(
        "{} configurations, {} of {} files updated",
        result.configurations,
        updated,
        result.files.len()
    ));

    Ok(())
}
