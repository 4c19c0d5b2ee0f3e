//! Master and aggregate files.
//!
//! Solutions sharing a master bff are merged. The master declares the
//! platforms in use, includes the global settings file, declares pre-build
//! steps and copies once, then includes every project file so that a file
//! is always included after the files it depends on.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::platform::{platform_bff, CompilerSettings, ToolchainInfo};
use crate::core::solution::{ProjectId, Solution, Workspace};
use crate::core::target::{DevEnv, Platform};
use crate::generator::cache::GenerationCache;
use crate::generator::errors::{ConfigurationError, GenerateError, GraphError};
use crate::generator::nodes::{copy_node_name, render_copy, render_step};
use crate::generator::project_bff::ProjectContribution;
use crate::generator::template::{format_list, remove_tagged_lines, render, Params};
use crate::generator::templates;
use crate::util::config::Config;
use crate::util::fs::{relative_slash, to_slash};

/// A generated file, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

const DEFAULT_SYSTEM_ROOT: &str = "C:/Windows";

fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(ext);
    PathBuf::from(s)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Path of the global settings file of a master.
pub fn global_settings_path(master_bff: &Path) -> PathBuf {
    with_extension(master_bff, "-globalsettings.bff")
}

/// Project files included by a master, dependencies first.
///
/// Each file is ranked by the longest dependency chain reaching it; deeper
/// files come first and ties are broken by path.
pub fn ordered_includes(
    ws: &Workspace,
    contributions: &[&ProjectContribution],
) -> Result<Vec<PathBuf>, GraphError> {
    let mut graph: DiGraph<PathBuf, ()> = DiGraph::new();
    let mut nodes: HashMap<PathBuf, NodeIndex> = HashMap::new();
    let mut file_of: HashMap<ProjectId, PathBuf> = HashMap::new();

    for contribution in contributions {
        file_of.insert(contribution.project, contribution.bff_path.clone());
        nodes
            .entry(contribution.bff_path.clone())
            .or_insert_with(|| graph.add_node(contribution.bff_path.clone()));
    }

    for contribution in contributions {
        let from = nodes[&contribution.bff_path];
        for emitted in &contribution.configurations {
            let conf = ws.conf(emitted.conf);
            for dep in conf
                .dependencies
                .iter()
                .chain(&conf.force_using)
                .chain(&conf.build_only)
            {
                let Some(dep_file) = file_of.get(&ws.conf(*dep).project) else {
                    continue;
                };
                if *dep_file == contribution.bff_path {
                    return Err(GraphError::SelfInclude {
                        file: to_slash(dep_file),
                    });
                }
                let to = nodes[dep_file];
                if !graph.contains_edge(from, to) {
                    graph.add_edge(from, to, ());
                }
            }
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| GraphError::CircularInclude {
        file: to_slash(&graph[cycle.node_id()]),
    })?;

    // Dependents precede their dependencies in `order`.
    let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
    for node in &order {
        let d = graph
            .neighbors_directed(*node, Direction::Incoming)
            .map(|pred| depth.get(&pred).map_or(0, |d| d + 1))
            .max()
            .unwrap_or(0);
        depth.insert(*node, d);
    }

    let mut files: Vec<(usize, PathBuf)> = depth
        .into_iter()
        .map(|(node, d)| (d, graph[node].clone()))
        .collect();
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn compiler_sections(
    compilers: &BTreeSet<(Platform, DevEnv)>,
    config: &Config,
    cache: &GenerationCache,
) -> String {
    let mut by_name: BTreeMap<String, CompilerSettings> = BTreeMap::new();
    for &(platform, dev_env) in compilers {
        let Some(adapter) = platform_bff(platform) else {
            continue;
        };
        let sdk_version = cache.platform_version(dev_env, config);
        let toolchain = ToolchainInfo {
            windows_sdk_version: &sdk_version,
            windows_sdk_dir: config.sdk.windows_sdk_dir.as_deref(),
            visual_studio_dir: config
                .sdk
                .visual_studio_dirs
                .get(&dev_env.to_string())
                .map(String::as_str),
        };
        let settings = adapter.compiler_settings(dev_env, &toolchain);
        match by_name.get_mut(&settings.name) {
            Some(existing) => {
                for c in settings.configurations {
                    if !existing.configurations.iter().any(|e| e.name == c.name) {
                        existing.configurations.push(c);
                    }
                }
            }
            None => {
                by_name.insert(settings.name.clone(), settings);
            }
        }
    }

    let mut out = String::new();
    for settings in by_name.values() {
        out.push_str(&render(
            templates::COMPILER_SETTING,
            &Params::new()
                .with("compilerName", settings.name.as_str())
                .with("compilerRootPath", settings.root_path.as_str())
                .with("compilerExecutable", settings.executable.as_str())
                .with("compilerExtraFiles", format_list(&settings.extra_files, 4))
                .with("compilerFamily", settings.family),
        ));
        let mut configurations = settings.configurations.clone();
        configurations.sort_by(|a, b| a.name.cmp(&b.name));
        for c in &configurations {
            out.push_str(&render(
                templates::COMPILER_CONFIGURATION,
                &Params::new()
                    .with("configurationName", c.name.as_str())
                    .with("compilerName", c.compiler.as_str())
                    .with("librarian", c.librarian.as_str())
                    .with("linker", c.linker.as_str())
                    .with("baseOptions", c.base_options.as_str())
                    .with("platformIncludePaths", format_list(&c.include_paths, 4))
                    .with("platformLibPaths", format_list(&c.lib_paths, 4)),
            ));
        }
    }
    out
}

/// The `-globalsettings.bff` side file.
pub fn global_settings(
    title: &str,
    compilers: &BTreeSet<(Platform, DevEnv)>,
    config: &Config,
    cache: &GenerationCache,
) -> String {
    let fastbuild = &config.fastbuild;
    let adapters: Vec<_> = compilers.iter().filter_map(|(p, _)| platform_bff(*p)).collect();

    let mut environments = String::new();
    if adapters.iter().any(|a| !a.is_clang()) {
        environments.push_str(&render(
            templates::WINDOWS_ENVIRONMENT,
            &Params::new().with(
                "systemRoot",
                fastbuild.system_root.as_deref().unwrap_or(DEFAULT_SYSTEM_ROOT),
            ),
        ));
    }
    if adapters.iter().any(|a| a.is_clang()) {
        environments.push_str(templates::POSIX_ENVIRONMENT);
    }
    let environments = environments.trim_end().to_string();

    let mut text = render(
        templates::FILE_HEADER,
        &Params::new().with("projectName", format!("{} global settings", title)),
    );
    text.push_str(&render(
        templates::GLOBAL_SETTINGS,
        &Params::new()
            .with_opt("environments", (!environments.is_empty()).then_some(environments))
            .with_opt("cachePluginDll", fastbuild.cache_plugin_dll.as_deref())
            .with_opt("cachePath", fastbuild.cache_path.as_deref())
            .with_opt(
                "workerConnectionLimit",
                fastbuild.worker_connection_limit.map(|n| n.to_string()),
            )
            .with_opt("allowDbMigration", fastbuild.allow_db_migration.then_some("true")),
    ));
    text.push_str(&compiler_sections(compilers, config, cache));
    remove_tagged_lines(&text)
}

/// One master file and the solutions merged into it.
struct MasterGroup<'a> {
    master_bff: PathBuf,
    solutions: Vec<&'a Solution>,
}

fn group_solutions(ws: &Workspace) -> Vec<MasterGroup<'_>> {
    let mut groups: Vec<MasterGroup<'_>> = Vec::new();
    for solution in ws.solutions() {
        match groups.iter_mut().find(|g| g.master_bff == solution.master_bff) {
            Some(group) => group.solutions.push(solution),
            None => groups.push(MasterGroup {
                master_bff: solution.master_bff.clone(),
                solutions: vec![solution],
            }),
        }
    }
    groups
}

fn custom_section(
    contributions: &[&ProjectContribution],
    master_dir: &Path,
) -> Result<String, GenerateError> {
    let mut out = String::new();

    let mut declared = BTreeSet::new();
    for contribution in contributions {
        for (label, step) in &contribution.pre_build {
            if declared.insert(step.key.clone()) {
                out.push_str(&render_step(step, label, master_dir)?);
            }
        }
    }

    let mut copies: Vec<_> = contributions.iter().flat_map(|c| c.copies.iter()).collect();
    copies.sort_by_cached_key(|c| {
        (
            to_slash(&c.destination()).to_lowercase(),
            to_slash(&c.source).to_lowercase(),
        )
    });
    copies.dedup();

    let mut destinations: HashMap<PathBuf, &Path> = HashMap::new();
    for copy in copies {
        let destination = copy.destination();
        if let Some(existing) = destinations.get(&destination) {
            if *existing != copy.source.as_path() {
                tracing::error!(
                    "`{}` is copied to `{}` from both `{}` and `{}`",
                    copy_node_name(copy),
                    destination.display(),
                    existing.display(),
                    copy.source.display()
                );
            }
            continue;
        }
        destinations.insert(destination, copy.source.as_path());
        out.push_str(&render_copy(copy, master_dir));
    }

    if out.is_empty() {
        Ok(out)
    } else {
        Ok(format!("{}{}", templates::CUSTOM_SECTION_HEADER, out))
    }
}

/// Master, global settings and entry files of every solution.
///
/// `contributions` holds the generated projects; a master none of whose
/// projects was generated is an error.
pub fn emit_aggregate_files(
    ws: &Workspace,
    contributions: &[ProjectContribution],
    config: &Config,
    cache: &GenerationCache,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let by_project: HashMap<ProjectId, &ProjectContribution> =
        contributions.iter().map(|c| (c.project, c)).collect();
    let mut files = Vec::new();

    for group in group_solutions(ws) {
        let master_path = with_extension(&group.master_bff, ".bff");
        let master_dir = parent_dir(&master_path).to_path_buf();
        let title = group
            .master_bff
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "master".to_string());
        let _span = tracing::debug_span!("master", file = %master_path.display()).entered();

        let mut included: Vec<&ProjectContribution> = Vec::new();
        for solution in &group.solutions {
            for project in &solution.projects {
                if let Some(c) = by_project.get(project) {
                    if !included.iter().any(|i| i.project == *project) {
                        included.push(c);
                    }
                }
            }
        }
        // Dependencies of included projects are included too, even when no
        // solution of the group lists them.
        let mut next = 0;
        while next < included.len() {
            let contribution = included[next];
            next += 1;
            for emitted in &contribution.configurations {
                let conf = ws.conf(emitted.conf);
                for dep in conf
                    .dependencies
                    .iter()
                    .chain(&conf.force_using)
                    .chain(&conf.build_only)
                {
                    let project = ws.conf(*dep).project;
                    if included.iter().any(|i| i.project == project) {
                        continue;
                    }
                    if let Some(c) = by_project.get(&project) {
                        tracing::debug!(
                            "{}: including dependency `{}`",
                            master_path.display(),
                            ws.project(project).name
                        );
                        included.push(c);
                    }
                }
            }
        }
        if included.is_empty() {
            return Err(ConfigurationError::NoFastBuildProject {
                master: to_slash(&master_path),
            }
            .into());
        }

        let includes = ordered_includes(ws, &included)?;
        let compilers: BTreeSet<(Platform, DevEnv)> = included
            .iter()
            .flat_map(|c| c.compilers.iter().copied())
            .collect();
        let defines: BTreeSet<&'static str> = compilers
            .iter()
            .filter_map(|(p, _)| platform_bff(*p).map(|a| a.bff_define()))
            .collect();

        let settings_path = global_settings_path(&group.master_bff);
        let mut text = render(
            templates::FILE_HEADER,
            &Params::new().with("projectName", title.as_str()),
        );
        for define in &defines {
            text.push_str(&render(templates::DEFINE, &Params::new().with("define", *define)));
        }
        text.push_str(&render(
            templates::GLOBAL_CONFIGURATION_INCLUDE,
            &Params::new().with("globalSettingsInclude", relative_slash(&master_dir, &settings_path)),
        ));
        text.push_str(&custom_section(&included, &master_dir)?);

        let include_lines: Vec<String> = includes
            .iter()
            .map(|f| format!("#include \"{}\"", relative_slash(&master_dir, f)))
            .collect();
        text.push_str(&render(
            templates::INCLUDES,
            &Params::new()
                .with("projectName", title.as_str())
                .with("orderedIncludes", include_lines.join("\n")),
        ));

        let all_configs = config.generate.all_configs_section
            || group.solutions.iter().any(|s| s.all_configs_section);
        if all_configs {
            let built: BTreeSet<ProjectId> = group
                .solutions
                .iter()
                .flat_map(|s| s.build.iter().copied())
                .collect();
            let mut names: Vec<&str> = included
                .iter()
                .filter(|c| built.contains(&c.project))
                .flat_map(|c| c.configurations.iter().map(|e| e.short_name.as_str()))
                .collect();
            names.sort_unstable();
            names.dedup();
            text.push_str(&render(
                templates::ALL_CONFIGS_SECTION,
                &Params::new().with("configs", format_list(&names, 4)),
            ));
        }

        tracing::debug!(
            "{}: {} project files, {} compilers",
            master_path.display(),
            includes.len(),
            compilers.len()
        );

        files.push(GeneratedFile {
            path: master_path.clone(),
            contents: remove_tagged_lines(&text),
        });
        files.push(GeneratedFile {
            path: settings_path,
            contents: global_settings(&title, &compilers, config, cache),
        });

        for solution in &group.solutions {
            if solution.bff_path == group.master_bff {
                continue;
            }
            let entry = with_extension(&solution.bff_path, ".bff");
            let params = Params::new()
                .with("solutionName", solution.name.as_str())
                .with(
                    "masterBffPath",
                    relative_slash(parent_dir(&entry), &master_path),
                );
            files.push(GeneratedFile {
                path: entry,
                contents: render(templates::INCLUDE_MASTER_BFF, &params),
            });
        }
    }

    Ok(files)
}
