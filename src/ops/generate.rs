//! Implementation of `fastbff generate`.
//!
//! A run happens in two phases. Every project file and aggregate file is
//! first produced in memory, projects in parallel; nothing touches the disk
//! until that succeeded for the whole workspace. The files are then
//! written, skipping those whose content did not change.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::solution::Workspace;
use crate::generator::cache::GenerationCache;
use crate::generator::deps::DependencyOrderer;
use crate::generator::errors::{GenerateError, ToolingGap};
use crate::generator::master::{emit_aggregate_files, GeneratedFile};
use crate::generator::naming::UnityNamingStrategy;
use crate::generator::project_bff::{generate_project, ProjectContribution};
use crate::util::config::Config;
use crate::util::fs::{relative_slash, write_if_changed, WriteOutcome};
use crate::util::shell::Shell;

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Unity naming strategy
    pub unity_naming: UnityNamingStrategy,

    /// Produce everything but write nothing
    pub dry_run: bool,

    /// Write the list of generated outputs to this JSON file
    pub emit_outputs: Option<PathBuf>,

    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

/// Everything a run would write.
#[derive(Debug, Clone, Default)]
pub struct GenerationPlan {
    pub files: Vec<GeneratedFile>,
    /// Expanded unity shard paths
    pub unity_files: Vec<PathBuf>,
    pub skipped: Vec<ToolingGap>,
    /// Short names of the emitted configurations, in project order
    pub configurations: Vec<String>,
    pub unity_count: usize,
}

/// What happened to one generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileOutcome {
    Updated,
    Unchanged,
    DryRun,
}

impl FileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileOutcome::Updated => "updated",
            FileOutcome::Unchanged => "unchanged",
            FileOutcome::DryRun => "dry-run",
        }
    }
}

impl From<WriteOutcome> for FileOutcome {
    fn from(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Updated => FileOutcome::Updated,
            WriteOutcome::Unchanged => FileOutcome::Unchanged,
        }
    }
}

/// Result of a generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateResult {
    pub files: Vec<(PathBuf, FileOutcome)>,
    pub skipped: Vec<ToolingGap>,
    pub configurations: usize,
    /// Outputs manifest, when one was written
    pub outputs_manifest: Option<PathBuf>,
}

impl GenerateResult {
    pub fn updated(&self) -> usize {
        self.files
            .iter()
            .filter(|(_, o)| *o == FileOutcome::Updated)
            .count()
    }
}

/// Every file a run generated, for a later cleanup pass.
///
/// Paths are `/`-separated and relative to the description's directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputsManifest {
    pub generated: Vec<String>,
    pub unity_files: Vec<String>,
}

impl OutputsManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read outputs manifest: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse outputs manifest: {}", path.display()))
    }
}

/// Produce the text of every file of the workspace.
///
/// `on_project` is called once per project, from worker threads.
pub fn plan_generation(
    ws: &Workspace,
    config: &Config,
    cache: &GenerationCache,
    strategy: UnityNamingStrategy,
    on_project: &(dyn Fn(&str) + Sync),
) -> Result<GenerationPlan, GenerateError> {
    let orderer = DependencyOrderer::new(ws);
    orderer.check_cycles()?;

    let results: Vec<Result<Option<ProjectContribution>, GenerateError>> = ws
        .projects()
        .par_iter()
        .map(|project| {
            let result = generate_project(ws, &orderer, project, strategy);
            on_project(&project.name);
            result
        })
        .collect();

    let mut contributions = Vec::new();
    for result in results {
        if let Some(contribution) = result? {
            contributions.push(contribution);
        }
    }

    let aggregate = emit_aggregate_files(ws, &contributions, config, cache)?;

    let mut plan = GenerationPlan::default();
    for contribution in contributions {
        plan.unity_files.extend(contribution.unity_files);
        plan.skipped.extend(contribution.skipped);
        plan.configurations
            .extend(contribution.configurations.into_iter().map(|c| c.short_name));
        plan.files.push(GeneratedFile {
            path: contribution.bff_path,
            contents: contribution.text,
        });
    }
    plan.unity_count = plan.unity_files.len();
    plan.files.extend(aggregate);
    Ok(plan)
}

/// Generate and write every file of the workspace.
pub fn generate(
    ws: &Workspace,
    config: &Config,
    opts: &GenerateOptions,
    shell: &Arc<Shell>,
) -> Result<GenerateResult> {
    if let Some(j) = opts.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(j)
            .build_global()
            .ok(); // Ignore if already set
    }

    let cache = GenerationCache::new();
    let progress = Mutex::new(shell.progress(ws.projects().len() as u64, "Generating"));
    let plan = plan_generation(ws, config, &cache, opts.unity_naming, &|name| {
        tracing::debug!("generated {}", name);
        if let Ok(mut progress) = progress.lock() {
            progress.inc(1);
        }
    })?;
    if let Ok(progress) = progress.lock() {
        progress.finish();
    }

    let mut result = GenerateResult {
        skipped: plan.skipped,
        configurations: plan.configurations.len(),
        ..GenerateResult::default()
    };

    for file in &plan.files {
        let outcome = if opts.dry_run {
            FileOutcome::DryRun
        } else {
            write_if_changed(&file.path, &file.contents)?.into()
        };
        tracing::debug!("{}: {}", file.path.display(), outcome.as_str());
        result.files.push((file.path.clone(), outcome));
    }

    let outputs_path = opts
        .emit_outputs
        .clone()
        .or_else(|| config.generate.emit_outputs.clone());
    if let (Some(path), false) = (outputs_path, opts.dry_run) {
        let path = if path.is_absolute() {
            path
        } else {
            ws.root.join(path)
        };
        let manifest = OutputsManifest {
            generated: plan
                .files
                .iter()
                .map(|f| relative_slash(&ws.root, &f.path))
                .collect(),
            unity_files: plan
                .unity_files
                .iter()
                .map(|f| relative_slash(&ws.root, f))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&manifest)
            .context("failed to serialize outputs manifest")?;
        write_if_changed(&path, &json)?;
        result.outputs_manifest = Some(path);
    }

    Ok(result)
}
