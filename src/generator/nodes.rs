//! Node emission for one configuration.
//!
//! Buckets are walked in partition order. Every bucket but the last becomes
//! an `ObjectList`; the last one carries the artifact (a `Library`, or the
//! object list an `Executable`/`DLL` links). An `Alias` named after the
//! configuration's short name closes the configuration and is what other
//! nodes and command lines refer to.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::configuration::{
    BuildStep, BuildStepKind, Configuration, FileCopy, InputFileStrategy, LanguageFeatures,
    OutputType,
};
use crate::core::platform::PlatformBff;
use crate::core::project::{Project, SourceFile};
use crate::core::solution::{ConfId, Workspace};
use crate::generator::deps::{DependencyKind, DependencyOrderer};
use crate::generator::errors::{ConfigurationError, GenerateError};
use crate::generator::naming::{copy_alias, short_name, short_name_of, ResolvedUnity};
use crate::generator::subconfig::{extension_languages, SubConfigKey, SubConfigPartition};
use crate::generator::template::{format_list, render, Params};
use crate::generator::templates;
use crate::generator::unity::is_precomp_source;
use crate::util::fs::{is_inside_any, relative_slash};

/// Text of one configuration plus what it hands to the master file.
#[derive(Debug, Clone)]
pub struct ConfigurationNodes {
    pub conf: ConfId,
    pub short_name: String,
    pub text: String,
    /// Declared once in the master file
    pub pre_build: Vec<BuildStep>,
    /// Declared once in the master file
    pub copies: Vec<FileCopy>,
}

/// Reject settings no node shape can express.
pub fn validate(ws: &Workspace, conf: &Configuration) -> Result<(), ConfigurationError> {
    let label = ws.conf_label(conf.id);

    if conf.blob.fastbuild_blobbed && conf.blob.legacy_blobbed {
        return Err(ConfigurationError::ConflictingBlobbing {
            configuration: label,
        });
    }
    if !conf.steps.pre_link.is_empty() {
        return Err(ConfigurationError::PreLinkNotSupported {
            configuration: label,
        });
    }

    let steps = &conf.steps;
    let mut keys = HashSet::new();
    for step in steps
        .pre_build
        .iter()
        .chain(&steps.custom_pre_build)
        .chain(&steps.post_build)
        .chain(&steps.custom_post_build)
    {
        if step.kind.is_none() {
            return Err(ConfigurationError::UnsupportedBuildStep {
                configuration: label,
                step: step.key.clone(),
                kind: step.kind_name.clone(),
            });
        }
        if !keys.insert(step.key.as_str()) {
            return Err(ConfigurationError::DuplicateBuildStep {
                configuration: label,
                key: step.key.clone(),
            });
        }
    }
    Ok(())
}

/// Alias of the `Copy` node declared for `copy`.
pub fn copy_node_name(copy: &FileCopy) -> String {
    let file_name = copy
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    copy_alias(&file_name, &copy.destination_dir)
}

/// `Copy` section for `copy`, paths relative to `base`.
pub fn render_copy(copy: &FileCopy, base: &Path) -> String {
    let params = Params::new()
        .with("copyAlias", copy_node_name(copy))
        .with("copySource", relative_slash(base, &copy.source))
        .with("copyDest", format!("{}/", relative_slash(base, &copy.destination_dir)));
    render(templates::COPY_SECTION, &params)
}

/// Section declaring a build step, paths relative to `base`.
pub fn render_step(
    step: &BuildStep,
    conf_label: &str,
    base: &Path,
) -> Result<String, ConfigurationError> {
    let kind = step.kind.ok_or_else(|| ConfigurationError::UnsupportedBuildStep {
        configuration: conf_label.to_string(),
        step: step.key.clone(),
        kind: step.kind_name.clone(),
    })?;
    let output = step
        .output
        .as_deref()
        .ok_or_else(|| ConfigurationError::MissingField {
            entity: format!("build step `{}` of `{}`", step.key, conf_label),
            field: "output",
        })?;
    let rel = |p: &Path| relative_slash(base, p);

    if kind == BuildStepKind::Copy {
        let source = step.inputs.first().unwrap_or(&step.executable);
        let params = Params::new()
            .with("copyAlias", step.key.as_str())
            .with("copySource", rel(source.as_path()))
            .with("copyDest", rel(output));
        return Ok(render(templates::COPY_SECTION, &params));
    }

    let inputs: Vec<String> = step.inputs.iter().map(|p| rel(p.as_path())).collect();
    let params = Params::new()
        .with("stepName", step.key.as_str())
        .with("stepExecutable", rel(step.executable.as_path()))
        .with("stepInputs", format_list(&inputs, 4))
        .with("stepOutput", rel(output))
        .with_opt(
            "stepArguments",
            (!step.arguments.is_empty()).then_some(step.arguments.as_str()),
        )
        .with_opt("stepWorkingDir", step.working_dir.as_deref().map(rel))
        .with_opt("stepUseStdout", step.use_stdout_as_output.then_some("true"))
        .with_opt("stepAlwaysRun", step.always_run.then_some("true"));

    let template = match kind {
        BuildStepKind::Test => templates::TEST_SECTION,
        _ => templates::EXEC_SECTION,
    };
    Ok(render(template, &params))
}

fn librarian_options(platform: &dyn PlatformBff) -> &'static str {
    if platform.is_clang() {
        "rcs \"%2\" \"%1\""
    } else {
        "/NOLOGO /OUT:\"%2\" \"%1\""
    }
}

fn linker_options(platform: &dyn PlatformBff, output: OutputType) -> String {
    let (base, shared) = if platform.is_clang() {
        ("\"%1\" -o \"%2\"", " -shared")
    } else {
        ("/NOLOGO /OUT:\"%2\" \"%1\"", " /DLL")
    };
    if output == OutputType::Dll {
        format!("{}{}", base, shared)
    } else {
        base.to_string()
    }
}

/// Name of the node a dependent links for a library-shaped configuration.
fn link_node_name(dep_short: &str, dep: &Configuration) -> Option<String> {
    match dep.output {
        OutputType::Lib if dep.use_library_dependency_inputs => {
            Some(format!("{}_objects", dep_short))
        }
        OutputType::Lib => Some(format!("{}_Library", dep_short)),
        OutputType::Dll => Some(format!("{}_{}", dep_short, dep.output.node_kind())),
        OutputType::Exe | OutputType::Utility | OutputType::None => None,
    }
}

/// Emits the nodes of one configuration.
pub struct NodeEmitter<'a> {
    ws: &'a Workspace,
    orderer: &'a DependencyOrderer<'a>,
    project: &'a Project,
    conf: &'a Configuration,
    platform: &'a dyn PlatformBff,
    label: String,
    short: String,
}

/// Compile-node inputs of one bucket.
struct CompileInputs {
    platform_config: String,
    pre_build: Vec<String>,
}

impl<'a> NodeEmitter<'a> {
    pub fn new(
        ws: &'a Workspace,
        orderer: &'a DependencyOrderer<'a>,
        conf: &'a Configuration,
        platform: &'a dyn PlatformBff,
    ) -> Self {
        let project = ws.project(conf.project);
        NodeEmitter {
            ws,
            orderer,
            project,
            conf,
            platform,
            label: ws.conf_label(conf.id),
            short: short_name(project, conf, platform),
        }
    }

    pub fn short_name(&self) -> &str {
        &self.short
    }

    fn rel(&self, path: &Path) -> String {
        relative_slash(&self.project.path, path)
    }

    fn intermediate(&self) -> String {
        self.rel(&self.conf.intermediate_dir)
    }

    fn artifact_file(&self) -> PathBuf {
        let file_name = self
            .platform
            .output_filename(self.conf.output, &self.conf.output_stem());
        self.conf.output_file.with_file_name(file_name)
    }

    fn artifact_path(&self) -> String {
        self.rel(&self.artifact_file())
    }

    /// Static library written by the non-terminal bucket `index`:
    /// the artifact's stem, `_{index}`, and the platform's library extension.
    fn intermediate_library(&self, index: usize) -> String {
        let artifact = self.artifact_file();
        let stem = artifact
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self.platform.static_lib_extension();
        let dot = if ext.starts_with('.') { "" } else { "." };
        self.rel(&artifact.with_file_name(format!("{}_{}{}{}", stem, index, dot, ext)))
    }

    fn pch_output(&self) -> String {
        format!("$Intermediate$/{}.pch", self.conf.output_stem())
    }

    fn short_names(&self, confs: Vec<ConfId>) -> Vec<String> {
        confs.into_iter().map(|c| short_name_of(self.ws, c)).collect()
    }

    /// Emit every node of the configuration.
    ///
    /// `unity` is the unity serving the default bucket, if any.
    pub fn emit(
        &self,
        partition: &SubConfigPartition,
        unity: Option<&ResolvedUnity>,
    ) -> Result<ConfigurationNodes, GenerateError> {
        let _span = tracing::debug_span!("emit", configuration = %self.label).entered();
        let conf = self.conf;
        validate(self.ws, conf)?;

        let mut libraries = Vec::new();
        let mut alias_dependencies = Vec::new();
        if conf.output.is_linked() {
            for dep in self.orderer.ordered(conf.id, DependencyKind::Direct, true)? {
                let dep_conf = self.ws.conf(dep);
                if self.ws.project(dep_conf.project).export {
                    continue;
                }
                if !conf.resolved_dependencies.contains(&dep) {
                    return Err(ConfigurationError::UnresolvedDependency {
                        configuration: self.label.clone(),
                        dependency: self.ws.conf_label(dep),
                    }
                    .into());
                }
                let dep_short = short_name_of(self.ws, dep);
                match link_node_name(&dep_short, dep_conf) {
                    Some(node) => libraries.push(node),
                    None if dep_conf.output != OutputType::None => {
                        alias_dependencies.push(dep_short)
                    }
                    None => {}
                }
            }
        }

        let build_only =
            self.short_names(self.orderer.ordered(conf.id, DependencyKind::BuildOnly, true)?);
        let force_using =
            self.short_names(self.orderer.ordered(conf.id, DependencyKind::ForceUsing, false)?);
        let pre_build: Vec<BuildStep> = conf
            .steps
            .pre_build
            .iter()
            .chain(&conf.steps.custom_pre_build)
            .cloned()
            .collect();
        let pre_build_keys: Vec<String> = pre_build.iter().map(|s| s.key.clone()).collect();

        let mut text = String::new();
        let mut targets: Vec<String> = Vec::new();
        let compiles = matches!(
            conf.output,
            OutputType::Lib | OutputType::Exe | OutputType::Dll
        );

        let resources = if compiles {
            self.emit_resources(&mut text)
        } else {
            None
        };

        if compiles {
            let buckets: Vec<(&SubConfigKey, &Vec<SourceFile>)> = partition.iter().collect();
            let count = buckets.len();
            // Pre-build steps gate the first bucket, and the last one unless this is
            // a library in library-dependency-inputs mode.
            let ldi_library = conf.output == OutputType::Lib && conf.use_library_dependency_inputs;

            let mut sub_objects: Vec<String> = Vec::new();
            let mut terminal_objects: Option<String> = None;
            for (index, (key, files)) in buckets.into_iter().enumerate() {
                let mut inputs = CompileInputs {
                    platform_config: if key.is_c() {
                        self.platform.c_config_name(conf.target.dev_env)
                    } else {
                        self.platform.cpp_config_name(conf.target.dev_env)
                    },
                    pre_build: force_using.clone(),
                };
                let terminal = index + 1 == count;
                if index == 0 || (terminal && !ldi_library) {
                    inputs.pre_build.extend(pre_build_keys.iter().cloned());
                }
                let bucket_unity = if key.is_default() { unity } else { None };
                let compile = self.compile_options(key, files, partition, bucket_unity, &inputs);

                if !terminal && conf.output == OutputType::Lib && !ldi_library {
                    let node = format!("{}_{}_Library", self.short, index);
                    text.push_str(&self.node_begin(templates::LIBRARY_BEGIN, &node, &inputs));
                    text.push_str(&compile);
                    text.push_str(&render(
                        templates::LIBRARIAN_OPTIONS,
                        &Params::new()
                            .with("librarianAdditionalInputs", format_list::<String>(&[], 4))
                            .with("outputFile", self.intermediate_library(index))
                            .with("librarianOptions", librarian_options(self.platform)),
                    ));
                    text.push_str(templates::END_SECTION);
                    sub_objects.push(node);
                } else if !terminal {
                    let node = format!("{}_{}_objects", self.short, index);
                    text.push_str(&self.node_begin(templates::OBJECT_LIST_BEGIN, &node, &inputs));
                    text.push_str(&compile);
                    text.push_str(templates::END_SECTION);
                    sub_objects.push(node);
                } else if conf.output == OutputType::Lib && !ldi_library {
                    let node = format!("{}_Library", self.short);
                    let mut additional = sub_objects.clone();
                    additional.extend(resources.iter().cloned());
                    text.push_str(&self.node_begin(templates::LIBRARY_BEGIN, &node, &inputs));
                    text.push_str(&compile);
                    text.push_str(&render(
                        templates::LIBRARIAN_OPTIONS,
                        &Params::new()
                            .with("librarianAdditionalInputs", format_list(&additional, 4))
                            .with("outputFile", self.artifact_path())
                            .with("librarianOptions", librarian_options(self.platform)),
                    ));
                    text.push_str(templates::END_SECTION);
                    targets.push(node);
                } else {
                    let node = format!("{}_objects", self.short);
                    text.push_str(&self.node_begin(templates::OBJECT_LIST_BEGIN, &node, &inputs));
                    text.push_str(&compile);
                    text.push_str(templates::END_SECTION);
                    terminal_objects = Some(node);
                }
            }

            match conf.output {
                OutputType::Lib => {
                    targets.extend(sub_objects);
                    if conf.use_library_dependency_inputs {
                        targets.extend(terminal_objects);
                        targets.extend(resources);
                    }
                }
                _ => {
                    let mut link_inputs = sub_objects;
                    link_inputs.extend(terminal_objects);
                    link_inputs.extend(resources);
                    link_inputs.extend(libraries);
                    let node = format!("{}_{}", self.short, conf.output.node_kind());
                    text.push_str(&self.link_node(&node, &link_inputs, &build_only));
                    targets.push(node);
                }
            }
        }

        for step in conf.steps.post_build.iter().chain(&conf.steps.custom_post_build) {
            text.push_str(&render_step(step, &self.label, &self.project.path)?);
            targets.push(step.key.clone());
        }

        let copies: Vec<FileCopy> = if conf.output.is_linked() || conf.execute_target_copy {
            conf.copies.clone()
        } else {
            Vec::new()
        };
        targets.extend(copies.iter().map(copy_node_name));

        if !compiles {
            targets.extend(pre_build_keys);
        }
        targets.extend(alias_dependencies);
        targets.extend(build_only);
        if conf.output == OutputType::None && self.project.fastbuild_all {
            targets.extend(
                self.short_names(self.orderer.ordered(conf.id, DependencyKind::Direct, false)?),
            );
        }

        let mut seen = HashSet::new();
        targets.retain(|t| seen.insert(t.clone()));
        if targets.is_empty() {
            tracing::debug!("{}: nothing to alias", self.label);
        } else {
            text.push_str(&render(
                templates::ALIAS_SECTION,
                &Params::new()
                    .with("shortName", self.short.as_str())
                    .with("targets", format_list(&targets, 4)),
            ));
        }

        Ok(ConfigurationNodes {
            conf: conf.id,
            short_name: self.short.clone(),
            text,
            pre_build,
            copies,
        })
    }

    fn node_begin(&self, template: &str, node: &str, inputs: &CompileInputs) -> String {
        render(
            template,
            &Params::new()
                .with("nodeName", node)
                .with("platformConfig", inputs.platform_config.as_str())
                .with("intermediate", self.intermediate()),
        )
    }

    fn emit_resources(&self, text: &mut String) -> Option<String> {
        if !self.platform.supports_resource_files() {
            return None;
        }
        let files: Vec<String> = self
            .project
            .source_files
            .iter()
            .filter(|f| f.is_resource() && !self.conf.files.build_exclude.contains(&f.path))
            .map(|f| f.relative.clone())
            .collect();
        if files.is_empty() {
            return None;
        }

        let params = Params::new()
            .with("shortName", self.short.as_str())
            .with(
                "platformConfig",
                self.platform.cpp_config_name(self.conf.target.dev_env),
            )
            .with("intermediate", self.intermediate())
            .with("resourceFiles", format_list(&files, 4));
        text.push_str(&render(templates::RESOURCES_BEGIN, &params));
        text.push_str(templates::END_SECTION);
        Some(format!("{}_resources", self.short))
    }

    /// Compiler option block of one bucket.
    fn compile_options(
        &self,
        key: &SubConfigKey,
        files: &[SourceFile],
        partition: &SubConfigPartition,
        unity: Option<&ResolvedUnity>,
        inputs: &CompileInputs,
    ) -> String {
        let conf = self.conf;
        let platform = self.platform;
        let mut out = String::new();

        let (define_flag, include_flag) = if platform.is_clang() {
            ("-D", "-I")
        } else {
            ("/D", "/I")
        };
        let defines: Vec<String> = conf
            .defines
            .iter()
            .map(|d| format!("{}\"{}\"", define_flag, d))
            .collect();
        let includes: Vec<String> = conf
            .include_paths
            .iter()
            .map(|p| format!("{}\"{}\"", include_flag, self.rel(p)))
            .collect();
        let non_empty = |s: String| (!s.is_empty()).then_some(s);
        let winrt = key
            .features
            .contains(LanguageFeatures::CONSUME_WINRT)
            || (conf.compile_as_winrt && !key.is_c());
        let clr = key.features.contains(LanguageFeatures::CLR);

        out.push_str(&render(
            templates::COMPILER_EXTRA_OPTIONS,
            &Params::new()
                .with_opt("defines", non_empty(defines.join(" ")))
                .with_opt("includePaths", non_empty(includes.join(" ")))
                .with_opt("languageFlag", platform.language_flag(key.languages))
                .with_opt(
                    "exceptionFlag",
                    non_empty(platform.exception_flag(key.exceptions).to_string()),
                )
                .with_opt("clrFlag", platform.clr_flag().filter(|_| clr))
                .with_opt("winrtFlag", platform.winrt_flag().filter(|_| winrt)),
        ));

        let pch = match (&conf.precomp.source, &conf.precomp.header) {
            (Some(source), Some(header)) if key.use_precompiled_header => Some((source, header)),
            _ => None,
        };
        let pch_use = pch.map(|(source, header)| {
            let pch_output = self.pch_output();
            out.push_str(&render(
                templates::PCH_OPTIONS,
                &Params::new()
                    .with("pchInputFile", self.rel(&self.project.root.join(source)))
                    .with("pchOutputFile", pch_output.as_str())
                    .with(
                        "pchCreateOptions",
                        platform.pch_create_options(header, &pch_output),
                    ),
            ));
            platform.pch_options(header, &pch_output)
        });

        let roots = self.project.source_roots();
        let mut input_roots: Vec<PathBuf> = Vec::new();
        if key.is_default() {
            if unity.is_some() {
                if conf.blob.strategy == InputFileStrategy::Exclude {
                    input_roots = self
                        .project
                        .blob_exclude_paths
                        .iter()
                        .filter(|p| is_inside_any(p, &roots))
                        .cloned()
                        .collect();
                }
            } else if !conf.is_blobbed()
                && conf.blob.no_blob_strategy == Some(InputFileStrategy::Exclude)
            {
                input_roots = roots.clone();
            }
        }

        let mut excluded: Vec<String> = Vec::new();
        if !input_roots.is_empty() {
            let mut paths: Vec<&PathBuf> = partition
                .non_default_files()
                .iter()
                .map(|f| &f.path)
                .chain(&conf.files.build_exclude)
                .filter(|p| is_inside_any(p, &input_roots))
                .collect();
            if let Some(source) = &conf.precomp.source {
                let pch_source = self.project.root.join(source);
                if is_inside_any(&pch_source, &input_roots) && !paths.contains(&&pch_source) {
                    excluded.push(self.rel(&pch_source));
                }
            }
            paths.sort();
            paths.dedup();
            excluded.extend(paths.into_iter().map(|p| self.rel(p)));
        }

        let listed: Vec<String> = files
            .iter()
            .filter(|f| !is_precomp_source(conf, f))
            .filter(|f| {
                unity.is_none()
                    || !self.project.is_blobbable(f)
                    || conf.files.blob_exclude.contains(&f.path)
            })
            .filter(|f| !is_inside_any(&f.path, &input_roots))
            .map(|f| f.relative.clone())
            .collect();

        let input_paths: Vec<String> = input_roots.iter().map(|p| self.rel(p)).collect();
        let patterns: Vec<String> = if input_paths.is_empty() {
            Vec::new()
        } else if key.is_c() {
            vec!["*.c".to_string()]
        } else if unity.is_some() {
            self.project
                .blob_extensions
                .iter()
                .map(|e| format!("*{}", e))
                .collect()
        } else {
            self.project
                .compile_extensions
                .iter()
                .filter(|e| extension_languages(e).is_empty())
                .map(|e| format!("*{}", e))
                .collect()
        };

        out.push_str(&render(
            templates::COMPILER_OPTIONS,
            &Params::new()
                .with("compileOptions", platform.compile_options())
                .with_opt("pchUseOptions", pch_use)
                .with_opt("unityName", unity.map(|u| u.name.as_str()))
                .with("inputPaths", format_list(&input_paths, 4))
                .with("inputPattern", format_list(&patterns, 4))
                .with("inputExcludedFiles", format_list(&excluded, 4))
                .with("sourceFiles", format_list(&listed, 4)),
        ));

        if !inputs.pre_build.is_empty() {
            out.push_str(&render(
                templates::PRE_BUILD_DEPENDENCIES,
                &Params::new().with("preBuildTargets", format_list(&inputs.pre_build, 4)),
            ));
        }
        out
    }

    fn link_node(&self, node: &str, link_inputs: &[String], build_only: &[String]) -> String {
        let conf = self.conf;
        let params = Params::new()
            .with("nodeKind", conf.output.node_kind())
            .with("nodeName", node)
            .with(
                "platformConfig",
                self.platform.cpp_config_name(conf.target.dev_env),
            )
            .with("intermediate", self.intermediate())
            .with("libraries", format_list(link_inputs, 4))
            .with("buildOnlyDependencies", format_list(build_only, 4))
            .with("outputFile", self.artifact_path())
            .with(
                "linkObjects",
                if conf.use_library_dependency_inputs {
                    "true"
                } else {
                    "false"
                },
            )
            .with("linkerOptions", linker_options(self.platform, conf.output));
        let mut text = render(templates::EXE_DLL_BEGIN, &params);
        text.push_str(templates::END_SECTION);
        text
    }
}
