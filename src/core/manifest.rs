//! FastBff.toml description parsing.
//!
//! The description lists solutions, projects, and per-project configurations.
//! It is deserialized into raw structs and validated into a [`Workspace`]:
//! paths become absolute, source files are discovered, and dependency
//! references are resolved to configuration ids.
//!
//! Project `root` and `path` are relative to the description's directory;
//! every other path of a project (file lists, output paths, steps, copies)
//! is relative to the project root.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::configuration::{
    BlobSettings, BuildStep, BuildStepKind, Configuration, FileCopy, FileOverrides,
    InputFileStrategy, OutputType, PrecompSettings,
};
use crate::core::project::RESOURCE_EXTENSION;
use crate::core::solution::{ConfId, ProjectId, Solution, Workspace};
use crate::core::target::{Blob, BuildSystem, DevEnv, Optimization, Platform, Target};
use crate::generator::errors::ConfigurationError;
use crate::util::fs::{glob_files, normalize_path, walk_files_with_extensions};

/// Default description file name.
pub const MANIFEST_NAME: &str = "FastBff.toml";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(t) => vec![t],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    solution: Option<OneOrMany<RawSolution>>,
    #[serde(default)]
    project: Vec<RawProject>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSolution {
    name: String,
    master_bff: Option<String>,
    #[serde(default)]
    projects: Vec<String>,
    #[serde(default)]
    build: Vec<String>,
    #[serde(default)]
    all_configs_section: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProject {
    name: String,
    root: Option<String>,
    path: Option<String>,
    bff_name: Option<String>,
    #[serde(default)]
    additional_source_roots: Vec<String>,
    #[serde(default)]
    files: Vec<String>,
    compile_extensions: Option<Vec<String>>,
    blob_extensions: Option<Vec<String>>,
    #[serde(default)]
    blob_exclude_paths: Vec<String>,
    #[serde(default)]
    fastbuild_all: bool,
    #[serde(default)]
    export: bool,
    #[serde(default)]
    configuration: Vec<RawConfiguration>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfiguration {
    name: String,
    platform: String,
    dev_env: Option<String>,
    optimization: Option<String>,
    blob: Option<String>,
    build_system: Option<String>,

    #[serde(default)]
    output: OutputType,
    output_file: Option<String>,
    intermediate_dir: Option<String>,
    #[serde(default = "default_true")]
    fastbuild: bool,

    #[serde(default)]
    fastbuild_blobbed: bool,
    #[serde(default)]
    legacy_blobbed: bool,
    #[serde(default)]
    blob_strategy: InputFileStrategy,
    no_blob_strategy: Option<InputFileStrategy>,
    unity_path: Option<String>,
    #[serde(default)]
    unity_count: u32,
    #[serde(default)]
    blob_count: u32,
    blob_path: Option<String>,
    #[serde(default)]
    isolate_writable_files: bool,
    isolate_writable_files_limit: Option<u32>,
    #[serde(default)]
    unity_section_bucket: u8,

    precomp_source: Option<String>,
    precomp_header: Option<String>,
    #[serde(default)]
    precomp_exclude: Vec<String>,
    #[serde(default)]
    precomp_exclude_folders: Vec<String>,
    #[serde(default)]
    precomp_exclude_extensions: Vec<String>,

    #[serde(default)]
    build_exclude: Vec<String>,
    #[serde(default)]
    blob_exclude: Vec<String>,
    #[serde(default)]
    compile_as_c: Vec<String>,
    #[serde(default)]
    compile_as_cpp: Vec<String>,
    #[serde(default)]
    compile_as_objc: Vec<String>,
    #[serde(default)]
    compile_as_objcpp: Vec<String>,
    #[serde(default)]
    compile_as_clr: Vec<String>,
    #[serde(default)]
    compile_as_non_clr: Vec<String>,
    #[serde(default)]
    consume_winrt: Vec<String>,
    #[serde(default)]
    exclude_winrt: Vec<String>,
    #[serde(default)]
    exceptions_enabled: Vec<String>,
    #[serde(default)]
    exceptions_enabled_extern_c: Vec<String>,
    #[serde(default)]
    exceptions_enabled_seh: Vec<String>,

    #[serde(default)]
    compile_as_winrt: bool,
    #[serde(default)]
    use_library_dependency_inputs: bool,
    #[serde(default)]
    execute_target_copy: bool,
    #[serde(default)]
    defines: Vec<String>,
    #[serde(default)]
    include_paths: Vec<String>,

    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    force_using: Vec<String>,
    #[serde(default)]
    build_only_dependencies: Vec<String>,

    #[serde(default)]
    pre_build: Vec<RawBuildStep>,
    #[serde(default)]
    custom_pre_build: Vec<RawBuildStep>,
    #[serde(default)]
    post_build: Vec<RawBuildStep>,
    #[serde(default)]
    custom_post_build: Vec<RawBuildStep>,
    #[serde(default)]
    pre_link: Vec<RawBuildStep>,
    #[serde(default)]
    copies: Vec<RawCopy>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuildStep {
    key: String,
    #[serde(default = "default_step_kind")]
    kind: String,
    executable: String,
    #[serde(default)]
    arguments: String,
    working_dir: Option<String>,
    #[serde(default)]
    inputs: Vec<String>,
    output: Option<String>,
    #[serde(default)]
    use_stdout_as_output: bool,
    #[serde(default)]
    always_run: bool,
}

fn default_step_kind() -> String {
    "exec".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCopy {
    source: String,
    destination: String,
}

/// Dependency references of one configuration, resolved after every project is known.
struct PendingDependencies {
    conf: ConfId,
    direct: Vec<String>,
    force_using: Vec<String>,
    build_only: Vec<String>,
}

/// Load a description file into a validated workspace.
pub fn load_workspace(path: &Path) -> Result<Workspace> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read description: {}", path.display()))?;

    parse_workspace(&content, path)
}

/// Parse description content. `path` locates the description for relative paths.
pub fn parse_workspace(content: &str, path: &Path) -> Result<Workspace> {
    let raw: RawManifest = toml::from_str(content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let base = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => absolute(p)?,
        _ => std::env::current_dir().context("failed to read current directory")?,
    };

    let mut ws = Workspace::new(&base);
    let mut pending = Vec::new();

    for raw_project in raw.project {
        load_project(&mut ws, &base, raw_project, &mut pending)?;
    }

    for deps in pending {
        let direct = resolve_refs(&ws, deps.conf, &deps.direct)?;
        let force_using = resolve_refs(&ws, deps.conf, &deps.force_using)?;
        let build_only = resolve_refs(&ws, deps.conf, &deps.build_only)?;
        let conf = ws.conf_mut(deps.conf);
        conf.dependencies = direct;
        conf.force_using = force_using;
        conf.build_only = build_only;
    }
    ws.resolve_dependencies();

    let raw_solutions = match raw.solution {
        Some(s) => s.into_vec(),
        None => vec![RawSolution {
            name: base
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Solution".to_string()),
            master_bff: None,
            projects: Vec::new(),
            build: Vec::new(),
            all_configs_section: false,
        }],
    };
    for raw_solution in raw_solutions {
        let solution = convert_solution(&ws, &base, raw_solution)?;
        ws.add_solution(solution);
    }

    tracing::debug!(
        "loaded {} projects, {} configurations, {} solutions from {}",
        ws.projects().len(),
        ws.configurations().len(),
        ws.solutions().len(),
        path.display()
    );

    Ok(ws)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        Ok(normalize_path(&cwd.join(path)))
    }
}

fn resolve(base: &Path, p: &str) -> PathBuf {
    normalize_path(&base.join(p))
}

fn resolve_all(base: &Path, items: &[String]) -> BTreeSet<PathBuf> {
    items.iter().map(|p| resolve(base, p)).collect()
}

fn dotted(ext: &str) -> String {
    let ext = ext.to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

fn load_project(
    ws: &mut Workspace,
    base: &Path,
    raw: RawProject,
    pending: &mut Vec<PendingDependencies>,
) -> Result<()> {
    if ws.find_project(&raw.name).is_some() {
        return Err(ConfigurationError::DuplicateProject { project: raw.name }.into());
    }

    let root = resolve(base, raw.root.as_deref().unwrap_or("."));
    let id = ws.add_project(&raw.name, &root);

    {
        let project = ws.project_mut(id);
        if let Some(path) = &raw.path {
            project.path = resolve(base, path);
        }
        if let Some(bff_name) = raw.bff_name {
            project.bff_name = bff_name;
        }
        project.additional_source_roots = raw
            .additional_source_roots
            .iter()
            .map(|p| resolve(&root, p))
            .collect();
        if let Some(exts) = raw.compile_extensions {
            project.compile_extensions = exts.iter().map(|e| dotted(e)).collect();
        }
        if let Some(exts) = raw.blob_extensions {
            project.blob_extensions = exts.iter().map(|e| dotted(e)).collect();
        }
        project.blob_exclude_paths = raw
            .blob_exclude_paths
            .iter()
            .map(|p| resolve(&root, p))
            .collect();
        project.fastbuild_all = raw.fastbuild_all;
        project.export = raw.export;
    }

    discover_sources(ws, id, &raw.files)?;

    let mut seen = BTreeSet::new();
    for raw_conf in raw.configuration {
        if !seen.insert((raw_conf.name.clone(), raw_conf.platform.to_ascii_lowercase())) {
            return Err(ConfigurationError::DuplicateConfiguration {
                project: raw.name.clone(),
                configuration: raw_conf.name,
            }
            .into());
        }
        let conf = convert_configuration(ws, id, &root, raw_conf, pending)?;
        tracing::trace!("added configuration {}", ws.conf_label(conf));
    }

    Ok(())
}

fn discover_sources(ws: &mut Workspace, id: ProjectId, patterns: &[String]) -> Result<()> {
    let project = ws.project(id);
    let mut wanted: Vec<String> = project.compile_extensions.iter().cloned().collect();
    wanted.push(RESOURCE_EXTENSION.to_string());

    let files: Vec<PathBuf> = if patterns.is_empty() {
        let exts: Vec<&str> = wanted.iter().map(String::as_str).collect();
        let mut all = Vec::new();
        for root in project.source_roots() {
            all.extend(walk_files_with_extensions(&root, &exts));
        }
        all
    } else {
        glob_files(&project.root, patterns)?
            .into_iter()
            .filter(|f| wanted.contains(&crate::util::fs::dotted_extension(f)))
            .collect()
    };

    let project = ws.project_mut(id);
    for file in files {
        project.add_source_file(normalize_path(&file));
    }
    tracing::debug!(
        "project {}: {} source files",
        project.name,
        project.source_files.len()
    );
    Ok(())
}

fn parse_target(project: &str, raw: &RawConfiguration) -> Result<Target> {
    let fragment_error = |e: crate::core::target::ParseFragmentError| {
        ConfigurationError::UnknownFragment {
            project: project.to_string(),
            configuration: raw.name.clone(),
            axis: e.axis,
            value: e.value,
        }
    };

    let platform: Platform = raw.platform.parse().map_err(fragment_error)?;
    let default = Target::default();
    let dev_env = match &raw.dev_env {
        Some(s) => s.parse::<DevEnv>().map_err(fragment_error)?,
        None if platform == Platform::MAC || platform == Platform::IOS => DevEnv::XCODE,
        None if platform == Platform::LINUX || platform == Platform::ANDROID => DevEnv::MAKE,
        None => default.dev_env,
    };
    let optimization = match &raw.optimization {
        Some(s) => s.parse::<Optimization>().map_err(fragment_error)?,
        None => raw.name.parse().unwrap_or(default.optimization),
    };
    let blob = match &raw.blob {
        Some(s) => s.parse::<Blob>().map_err(fragment_error)?,
        None if raw.fastbuild_blobbed => Blob::FAST_BUILD_UNITYS,
        None if raw.legacy_blobbed => Blob::BLOB,
        None => Blob::NO_BLOB,
    };
    let build_system = match &raw.build_system {
        Some(s) => s.parse::<BuildSystem>().map_err(fragment_error)?,
        None => BuildSystem::default(),
    };

    Ok(Target {
        platform,
        dev_env,
        optimization,
        blob,
        build_system,
    })
}

fn convert_step(root: &Path, raw: RawBuildStep) -> BuildStep {
    let kind = match raw.kind.as_str() {
        "exec" => Some(BuildStepKind::Exec),
        "test" => Some(BuildStepKind::Test),
        "copy" => Some(BuildStepKind::Copy),
        _ => None,
    };
    BuildStep {
        key: raw.key,
        kind,
        kind_name: raw.kind,
        executable: resolve(root, &raw.executable),
        arguments: raw.arguments,
        working_dir: raw.working_dir.map(|p| resolve(root, &p)),
        inputs: raw.inputs.iter().map(|p| resolve(root, p)).collect(),
        output: raw.output.map(|p| resolve(root, &p)),
        use_stdout_as_output: raw.use_stdout_as_output,
        always_run: raw.always_run,
    }
}

fn convert_configuration(
    ws: &mut Workspace,
    project: ProjectId,
    root: &Path,
    raw: RawConfiguration,
    pending: &mut Vec<PendingDependencies>,
) -> Result<ConfId> {
    let project_name = ws.project(project).name.clone();
    let target = parse_target(&project_name, &raw)?;

    let conf: &mut Configuration = ws.add_configuration(project, &raw.name, target);
    let id = conf.id;

    conf.output = raw.output;
    conf.output_file = resolve(
        root,
        raw.output_file
            .as_deref()
            .unwrap_or(&format!("bin/{}_{}", project_name, raw.name)),
    );
    conf.intermediate_dir = resolve(
        root,
        raw.intermediate_dir
            .as_deref()
            .unwrap_or(&format!("obj/{}/{}", target.platform, raw.name)),
    );
    conf.fastbuild = raw.fastbuild;

    conf.blob = BlobSettings {
        fastbuild_blobbed: raw.fastbuild_blobbed,
        legacy_blobbed: raw.legacy_blobbed,
        strategy: raw.blob_strategy,
        no_blob_strategy: raw.no_blob_strategy,
        unity_path: raw.unity_path.map(|p| resolve(root, &p)),
        unity_count: raw.unity_count,
        blob_count: raw.blob_count,
        blob_path: raw.blob_path.map(|p| resolve(root, &p)),
        isolate_writable_files: raw.isolate_writable_files,
        isolate_writable_files_limit: raw.isolate_writable_files_limit,
        section_bucket: raw.unity_section_bucket,
    };

    conf.precomp = PrecompSettings {
        source: raw.precomp_source,
        header: raw.precomp_header,
        exclude: resolve_all(root, &raw.precomp_exclude),
        exclude_folders: raw
            .precomp_exclude_folders
            .iter()
            .map(|p| resolve(root, p))
            .collect(),
        exclude_extensions: raw
            .precomp_exclude_extensions
            .iter()
            .map(|e| dotted(e))
            .collect(),
    };

    conf.files = FileOverrides {
        build_exclude: resolve_all(root, &raw.build_exclude),
        blob_exclude: resolve_all(root, &raw.blob_exclude),
        compile_as_c: resolve_all(root, &raw.compile_as_c),
        compile_as_cpp: resolve_all(root, &raw.compile_as_cpp),
        compile_as_objc: resolve_all(root, &raw.compile_as_objc),
        compile_as_objcpp: resolve_all(root, &raw.compile_as_objcpp),
        compile_as_clr: resolve_all(root, &raw.compile_as_clr),
        compile_as_non_clr: resolve_all(root, &raw.compile_as_non_clr),
        consume_winrt: resolve_all(root, &raw.consume_winrt),
        exclude_winrt: resolve_all(root, &raw.exclude_winrt),
        exceptions_enabled: resolve_all(root, &raw.exceptions_enabled),
        exceptions_enabled_extern_c: resolve_all(root, &raw.exceptions_enabled_extern_c),
        exceptions_enabled_seh: resolve_all(root, &raw.exceptions_enabled_seh),
    };

    conf.compile_as_winrt = raw.compile_as_winrt;
    conf.use_library_dependency_inputs = raw.use_library_dependency_inputs;
    conf.execute_target_copy = raw.execute_target_copy;
    conf.defines = raw.defines;
    conf.include_paths = raw.include_paths.iter().map(|p| resolve(root, p)).collect();

    conf.steps.pre_build = raw.pre_build.into_iter().map(|s| convert_step(root, s)).collect();
    conf.steps.custom_pre_build = raw
        .custom_pre_build
        .into_iter()
        .map(|s| convert_step(root, s))
        .collect();
    conf.steps.post_build = raw.post_build.into_iter().map(|s| convert_step(root, s)).collect();
    conf.steps.custom_post_build = raw
        .custom_post_build
        .into_iter()
        .map(|s| convert_step(root, s))
        .collect();
    conf.steps.pre_link = raw.pre_link.into_iter().map(|s| convert_step(root, s)).collect();
    conf.copies = raw
        .copies
        .iter()
        .map(|c| FileCopy {
            source: resolve(root, &c.source),
            destination_dir: resolve(root, &c.destination),
        })
        .collect();

    pending.push(PendingDependencies {
        conf: id,
        direct: raw.dependencies,
        force_using: raw.force_using,
        build_only: raw.build_only_dependencies,
    });

    Ok(id)
}

/// Resolve `Project` or `Project:Configuration` references of `from`.
fn resolve_refs(ws: &Workspace, from: ConfId, refs: &[String]) -> Result<Vec<ConfId>> {
    let source = ws.conf(from);
    let mut out = Vec::with_capacity(refs.len());

    for reference in refs {
        let (project_name, conf_name) = match reference.split_once(':') {
            Some((p, c)) => (p, Some(c)),
            None => (reference.as_str(), None),
        };

        let unknown = || ConfigurationError::UnknownDependency {
            configuration: ws.conf_label(from),
            reference: reference.clone(),
        };

        let project = ws.find_project(project_name).ok_or_else(unknown)?;
        let same_platform = project
            .configurations
            .iter()
            .copied()
            .filter(|c| ws.conf(*c).target.platform == source.target.platform);

        let found = match conf_name {
            Some(name) => same_platform
                .clone()
                .find(|c| ws.conf(*c).name == name),
            None => same_platform
                .clone()
                .find(|c| ws.conf(*c).name == source.name)
                .or_else(|| {
                    same_platform
                        .clone()
                        .find(|c| ws.conf(*c).target.optimization == source.target.optimization)
                }),
        };

        let dep = found.ok_or_else(unknown)?;
        if !out.contains(&dep) {
            out.push(dep);
        }
    }

    Ok(out)
}

fn convert_solution(ws: &Workspace, base: &Path, raw: RawSolution) -> Result<Solution> {
    let lookup = |name: &String| -> Result<ProjectId> {
        ws.find_project(name)
            .map(|p| p.id)
            .ok_or_else(|| {
                ConfigurationError::UnknownProject {
                    solution: raw.name.clone(),
                    project: name.clone(),
                }
                .into()
            })
    };

    let projects: Vec<ProjectId> = if raw.projects.is_empty() {
        ws.projects().iter().map(|p| p.id).collect()
    } else {
        raw.projects.iter().map(lookup).collect::<Result<_>>()?
    };

    let build: BTreeSet<ProjectId> = if raw.build.is_empty() {
        projects.iter().copied().collect()
    } else {
        raw.build.iter().map(lookup).collect::<Result<_>>()?
    };

    let bff_path = resolve(base, &raw.name);
    let master_bff = raw
        .master_bff
        .as_deref()
        .map(|m| resolve(base, m))
        .unwrap_or_else(|| bff_path.clone());

    Ok(Solution {
        name: raw.name,
        master_bff,
        bff_path,
        projects,
        build,
        all_configs_section: raw.all_configs_section,
    })
}
