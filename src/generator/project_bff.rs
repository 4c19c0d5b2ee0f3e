//! Per-project file assembly.
//!
//! A project's configurations are partitioned, their unities grouped and
//! named, then every configuration's nodes are emitted in platform order
//! under `#if` guards. The finished text and everything the master file
//! needs are returned as a [`ProjectContribution`]; nothing is written here.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::core::configuration::{BuildStep, FileCopy};
use crate::core::platform::{platform_bff, PlatformBff};
use crate::core::project::Project;
use crate::core::solution::{ConfId, ProjectId, Workspace};
use crate::core::target::{DevEnv, Platform};
use crate::generator::deps::DependencyOrderer;
use crate::generator::errors::{GenerateError, ToolingGap};
use crate::generator::naming::{resolve_unities, ResolvedUnity, UnityNamingStrategy};
use crate::generator::nodes::NodeEmitter;
use crate::generator::subconfig::{partition, SubConfigPartition};
use crate::generator::template::{format_list, remove_tagged_lines, render, Params};
use crate::generator::templates;
use crate::generator::unity::{configure_unity, UnityGroup};

/// A configuration that made it into the project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedConfiguration {
    pub conf: ConfId,
    pub short_name: String,
}

/// Everything one project hands to the aggregate files.
#[derive(Debug, Clone)]
pub struct ProjectContribution {
    pub project: ProjectId,
    pub bff_path: PathBuf,
    pub text: String,
    pub configurations: Vec<EmittedConfiguration>,
    /// Pre-build steps with the label of the configuration declaring them
    pub pre_build: Vec<(String, BuildStep)>,
    pub copies: Vec<FileCopy>,
    /// Compilers the project's nodes use
    pub compilers: BTreeSet<(Platform, DevEnv)>,
    /// Absolute paths of every unity shard
    pub unity_files: Vec<PathBuf>,
    pub skipped: Vec<ToolingGap>,
}

/// Adapter of `platform`, or the gap explaining why there is none.
fn fastbuild_platform(
    ws: &Workspace,
    conf: ConfId,
    platform: Platform,
) -> Result<&'static dyn PlatformBff, ToolingGap> {
    let gap = |reason: &str| ToolingGap {
        configuration: ws.conf_label(conf),
        platform: platform.to_string(),
        reason: reason.to_string(),
    };
    match platform_bff(platform) {
        Some(adapter) if adapter.supports_fastbuild() => Ok(adapter),
        Some(_) => Err(gap("the platform does not support FASTBuild")),
        None => Err(gap("no FASTBuild adapter is registered for the platform")),
    }
}

struct Prepared {
    conf: ConfId,
    platform: &'static dyn PlatformBff,
    partition: SubConfigPartition,
}

fn render_unity(unity: &ResolvedUnity) -> String {
    let d = &unity.descriptor;
    let params = Params::new()
        .with("unityName", unity.name.as_str())
        .with("unityInputPath", format_list(&d.input_paths, 4))
        .with("unityInputExcludePath", format_list(&d.exclude_paths, 4))
        .with("unityInputPattern", format_list(&d.input_pattern, 4))
        .with("unityInputFiles", format_list(&d.input_files, 4))
        .with("unityInputExcludedFiles", format_list(&d.excluded_files, 4))
        .with_opt(
            "unityIsolateWritableFiles",
            d.isolate_writable_files.then_some("true"),
        )
        .with_opt(
            "unityIsolateWritableFilesLimit",
            d.isolate_writable_files_limit.map(|n| n.to_string()),
        )
        .with("unityOutputPath", d.output_path.as_str())
        .with("unityOutputPattern", unity.output_pattern.as_str())
        .with_opt("unityNumFiles", d.num_files.map(|n| n.to_string()))
        .with_opt("unityPch", d.pch.as_deref());
    render(templates::UNITY_SECTION, &params)
}

/// Generate the file of one project.
///
/// Returns `None` for export-only projects and projects with no
/// configuration in the FASTBuild graph.
pub fn generate_project(
    ws: &Workspace,
    orderer: &DependencyOrderer<'_>,
    project: &Project,
    strategy: UnityNamingStrategy,
) -> Result<Option<ProjectContribution>, GenerateError> {
    if project.export {
        return Ok(None);
    }
    let _span = tracing::debug_span!("project", name = %project.name).entered();

    let mut confs: Vec<ConfId> = project
        .configurations
        .iter()
        .copied()
        .filter(|&c| ws.conf(c).fastbuild)
        .collect();
    confs.sort_by_key(|&c| ws.conf(c).target.platform);

    let mut skipped = Vec::new();
    let mut prepared = Vec::new();
    let mut group = UnityGroup::new();
    for conf_id in confs {
        let conf = ws.conf(conf_id);
        let label = ws.conf_label(conf_id);
        let platform = match fastbuild_platform(ws, conf_id, conf.target.platform) {
            Ok(platform) => platform,
            Err(gap) => {
                tracing::warn!("{}", gap);
                skipped.push(gap);
                continue;
            }
        };

        let mut parts = match partition(project, conf, &label, platform) {
            Ok(parts) => parts,
            Err(GenerateError::Tooling(gap)) => {
                tracing::warn!("{}", gap);
                skipped.push(gap);
                continue;
            }
            Err(e) => return Err(e),
        };
        if let Some(descriptor) = configure_unity(project, conf, &mut parts) {
            group.insert(descriptor, conf_id);
        }
        prepared.push(Prepared {
            conf: conf_id,
            platform,
            partition: parts,
        });
    }

    if prepared.is_empty() {
        tracing::debug!("{}: no configuration to generate", project.name);
        return Ok(None);
    }

    let unities = resolve_unities(ws, project, &group, strategy)?;

    let mut text = render(
        templates::FILE_HEADER,
        &Params::new().with("projectName", project.name.as_str()),
    );
    if !unities.is_empty() {
        text.push_str(templates::UNITY_BEGIN);
        for unity in &unities {
            text.push_str(&render_unity(unity));
        }
    }

    let mut configurations = Vec::new();
    let mut pre_build = Vec::new();
    let mut copies = Vec::new();
    let mut compilers = BTreeSet::new();
    let mut open_define: Option<&'static str> = None;

    for item in &prepared {
        let conf = ws.conf(item.conf);
        let define = item.platform.bff_define();
        if open_define != Some(define) {
            if let Some(previous) = open_define {
                text.push_str(&render(
                    templates::PLATFORM_END,
                    &Params::new().with("define", previous),
                ));
            }
            text.push_str(&render(
                templates::PLATFORM_BEGIN,
                &Params::new().with("define", define),
            ));
            open_define = Some(define);
        }

        let unity = unities.iter().find(|u| u.configurations.contains(&item.conf));
        let nodes = NodeEmitter::new(ws, orderer, conf, item.platform).emit(&item.partition, unity)?;
        text.push_str(&nodes.text);

        let label = ws.conf_label(item.conf);
        pre_build.extend(nodes.pre_build.into_iter().map(|s| (label.clone(), s)));
        copies.extend(nodes.copies);
        compilers.insert((conf.target.platform, conf.target.dev_env));
        configurations.push(EmittedConfiguration {
            conf: item.conf,
            short_name: nodes.short_name,
        });
    }
    if let Some(define) = open_define {
        text.push_str(&render(
            templates::PLATFORM_END,
            &Params::new().with("define", define),
        ));
    }

    let unity_files = unities
        .iter()
        .flat_map(|u| u.shard_files.iter().map(|f| project.path.join(f)))
        .collect();

    tracing::debug!(
        "{}: {} configurations, {} unities",
        project.name,
        configurations.len(),
        unities.len()
    );

    Ok(Some(ProjectContribution {
        project: project.id,
        bff_path: project.bff_path(),
        text: remove_tagged_lines(&text),
        configurations,
        pre_build,
        copies,
        compilers,
        unity_files,
        skipped,
    }))
}
