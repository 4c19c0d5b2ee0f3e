//! Project configurations.
//!
//! A [`Configuration`] is one project built for one [`Target`]. It carries the
//! output type, blobbing and precompiled header settings, the per-file
//! override lists that drive sub-configuration partitioning, dependencies,
//! and build steps.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::solution::{ConfId, ProjectId};
use crate::core::target::Target;

/// What a configuration produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Static library
    #[default]
    #[serde(alias = "static")]
    Lib,

    /// Shared library
    #[serde(alias = "shared")]
    Dll,

    /// Executable
    #[serde(alias = "bin")]
    Exe,

    /// Runs build steps only, no compiled artifact
    Utility,

    /// Nothing is produced; only an alias is generated
    None,
}

impl OutputType {
    /// Name of the artifact node kind in generated files.
    pub fn node_kind(&self) -> &'static str {
        match self {
            OutputType::Lib => "Library",
            OutputType::Dll => "DLL",
            OutputType::Exe => "Executable",
            OutputType::Utility => "Utility",
            OutputType::None => "None",
        }
    }

    /// Executables and shared libraries run a link step.
    pub fn is_linked(&self) -> bool {
        matches!(self, OutputType::Exe | OutputType::Dll)
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_kind())
    }
}

/// How files are handed to a unity: listed one by one, or by folder with exclusions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFileStrategy {
    Include,
    #[default]
    Exclude,
}

/// Exception handling model of a sub-configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ExceptionMode {
    #[default]
    Disable,
    Enable,
    EnableWithExternC,
    EnableWithSeh,
}

bitflags! {
    /// Source languages a sub-configuration compiles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Languages: u8 {
        const ASM = 1 << 0;
        const C = 1 << 1;
        const CPP = 1 << 2;
        const OBJC = 1 << 3;
        const OBJCPP = 1 << 4;
        const SWIFT = 1 << 5;
        const NASM = 1 << 6;
    }
}

bitflags! {
    /// Language features toggled per file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LanguageFeatures: u8 {
        const CLR = 1 << 0;
        const NON_CLR = 1 << 1;
        const CONSUME_WINRT = 1 << 2;
    }
}

/// Blobbing settings of a configuration.
#[derive(Debug, Clone, Default)]
pub struct BlobSettings {
    /// Aggregate the default bucket through FASTBuild unity nodes
    pub fastbuild_blobbed: bool,
    /// Aggregate through pre-generated blob files instead
    pub legacy_blobbed: bool,
    pub strategy: InputFileStrategy,
    /// Strategy for configurations that are not blobbed at all
    pub no_blob_strategy: Option<InputFileStrategy>,
    /// Directory receiving the generated unity files
    pub unity_path: Option<PathBuf>,
    pub unity_count: u32,
    pub blob_count: u32,
    /// Static blob directory, excluded from unity input paths
    pub blob_path: Option<PathBuf>,
    pub isolate_writable_files: bool,
    pub isolate_writable_files_limit: Option<u32>,
    pub section_bucket: u8,
}

impl BlobSettings {
    /// Number of unity shards, `None` when neither count is set.
    pub fn shard_count(&self) -> Option<u32> {
        match (self.unity_count, self.blob_count) {
            (0, 0) => None,
            (0, n) | (n, _) => Some(n),
        }
    }
}

/// Precompiled header settings.
#[derive(Debug, Clone, Default)]
pub struct PrecompSettings {
    /// Source file creating the precompiled header, relative to the project root
    pub source: Option<String>,
    /// Header name passed to the compiler
    pub header: Option<String>,
    pub exclude: BTreeSet<PathBuf>,
    pub exclude_folders: Vec<PathBuf>,
    /// Dotted, lowercase extensions
    pub exclude_extensions: BTreeSet<String>,
}

impl PrecompSettings {
    /// Whether `file` must not use the precompiled header.
    pub fn excludes(&self, file: &Path, extension: &str) -> bool {
        self.exclude.contains(file)
            || self.exclude_folders.iter().any(|f| file.starts_with(f))
            || self.exclude_extensions.contains(extension)
    }
}

/// Per-file override lists, as absolute paths.
#[derive(Debug, Clone, Default)]
pub struct FileOverrides {
    pub build_exclude: BTreeSet<PathBuf>,
    pub blob_exclude: BTreeSet<PathBuf>,
    pub compile_as_c: BTreeSet<PathBuf>,
    pub compile_as_cpp: BTreeSet<PathBuf>,
    pub compile_as_objc: BTreeSet<PathBuf>,
    pub compile_as_objcpp: BTreeSet<PathBuf>,
    pub compile_as_clr: BTreeSet<PathBuf>,
    pub compile_as_non_clr: BTreeSet<PathBuf>,
    pub consume_winrt: BTreeSet<PathBuf>,
    pub exclude_winrt: BTreeSet<PathBuf>,
    pub exceptions_enabled: BTreeSet<PathBuf>,
    pub exceptions_enabled_extern_c: BTreeSet<PathBuf>,
    pub exceptions_enabled_seh: BTreeSet<PathBuf>,
}

/// Kind of a build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStepKind {
    /// Run an executable
    Exec,
    /// Run a test executable
    Test,
    /// Copy a file
    Copy,
}

impl BuildStepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStepKind::Exec => "exec",
            BuildStepKind::Test => "test",
            BuildStepKind::Copy => "copy",
        }
    }
}

/// A pre- or post-build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    /// Unique key, used as the node alias
    pub key: String,
    /// Declared kind; `None` when the description names a kind with no node form
    pub kind: Option<BuildStepKind>,
    /// The kind as written, kept for error reporting
    pub kind_name: String,
    pub executable: PathBuf,
    pub arguments: String,
    pub working_dir: Option<PathBuf>,
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub use_stdout_as_output: bool,
    pub always_run: bool,
}

/// Build steps attached to a configuration.
#[derive(Debug, Clone, Default)]
pub struct BuildSteps {
    pub pre_build: Vec<BuildStep>,
    pub custom_pre_build: Vec<BuildStep>,
    pub post_build: Vec<BuildStep>,
    pub custom_post_build: Vec<BuildStep>,
    pub pre_link: Vec<BuildStep>,
}

/// A post-build file copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileCopy {
    pub source: PathBuf,
    pub destination_dir: PathBuf,
}

impl FileCopy {
    pub fn destination(&self) -> PathBuf {
        match self.source.file_name() {
            Some(name) => self.destination_dir.join(name),
            None => self.destination_dir.clone(),
        }
    }
}

/// One project built for one target.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub id: ConfId,
    pub project: ProjectId,
    pub name: String,
    pub target: Target,
    pub output: OutputType,
    /// Artifact path without extension
    pub output_file: PathBuf,
    pub intermediate_dir: PathBuf,
    /// Participates in the generated FASTBuild graph
    pub fastbuild: bool,
    pub blob: BlobSettings,
    pub precomp: PrecompSettings,
    pub files: FileOverrides,
    pub compile_as_winrt: bool,
    pub use_library_dependency_inputs: bool,
    pub execute_target_copy: bool,
    pub defines: Vec<String>,
    pub include_paths: Vec<PathBuf>,
    pub dependencies: Vec<ConfId>,
    pub force_using: Vec<ConfId>,
    pub build_only: Vec<ConfId>,
    /// Transitive closure of `dependencies`, filled at load time
    pub resolved_dependencies: BTreeSet<ConfId>,
    pub steps: BuildSteps,
    pub copies: Vec<FileCopy>,
}

impl Configuration {
    /// Create a configuration with default settings.
    pub fn new(id: ConfId, project: ProjectId, name: impl Into<String>, target: Target) -> Self {
        let name = name.into();
        Configuration {
            id,
            project,
            output_file: PathBuf::from(&name),
            intermediate_dir: PathBuf::from("obj").join(&name),
            name,
            target,
            output: OutputType::default(),
            fastbuild: true,
            blob: BlobSettings::default(),
            precomp: PrecompSettings::default(),
            files: FileOverrides::default(),
            compile_as_winrt: false,
            use_library_dependency_inputs: false,
            execute_target_copy: false,
            defines: Vec::new(),
            include_paths: Vec::new(),
            dependencies: Vec::new(),
            force_using: Vec::new(),
            build_only: Vec::new(),
            resolved_dependencies: BTreeSet::new(),
            steps: BuildSteps::default(),
            copies: Vec::new(),
        }
    }

    /// Whether any blobbing mechanism applies.
    pub fn is_blobbed(&self) -> bool {
        self.blob.fastbuild_blobbed || self.blob.legacy_blobbed
    }

    /// Artifact file stem, e.g. `Core_Debug`.
    pub fn output_stem(&self) -> String {
        self.output_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_count() {
        let mut blob = BlobSettings::default();
        assert_eq!(blob.shard_count(), None);

        blob.blob_count = 3;
        assert_eq!(blob.shard_count(), Some(3));

        blob.unity_count = 8;
        assert_eq!(blob.shard_count(), Some(8));
    }

    #[test]
    fn test_precomp_exclusion() {
        let precomp = PrecompSettings {
            exclude: [PathBuf::from("/p/src/a.cpp")].into_iter().collect(),
            exclude_folders: vec![PathBuf::from("/p/third_party")],
            exclude_extensions: [".cc".to_string()].into_iter().collect(),
            ..PrecompSettings::default()
        };

        assert!(precomp.excludes(Path::new("/p/src/a.cpp"), ".cpp"));
        assert!(precomp.excludes(Path::new("/p/third_party/zlib/inflate.cpp"), ".cpp"));
        assert!(precomp.excludes(Path::new("/p/src/b.cc"), ".cc"));
        assert!(!precomp.excludes(Path::new("/p/src/b.cpp"), ".cpp"));
    }

    #[test]
    fn test_output_type_deserialize_aliases() {
        #[derive(Deserialize)]
        struct Wrapper {
            output: OutputType,
        }

        let w: Wrapper = toml::from_str("output = \"static\"").unwrap();
        assert_eq!(w.output, OutputType::Lib);
        let w: Wrapper = toml::from_str("output = \"exe\"").unwrap();
        assert_eq!(w.output.node_kind(), "Executable");
    }

    #[test]
    fn test_copy_destination() {
        let copy = FileCopy {
            source: PathBuf::from("/p/data/config.ini"),
            destination_dir: PathBuf::from("/out/bin"),
        };
        assert_eq!(copy.destination(), PathBuf::from("/out/bin/config.ini"));
    }
}
