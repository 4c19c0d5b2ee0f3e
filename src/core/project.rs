//! Projects and their source files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::solution::{ConfId, ProjectId};
use crate::util::fs::{dotted_extension, relative_slash};

/// Extensions compiled by default.
pub const DEFAULT_COMPILE_EXTENSIONS: &[&str] = &[
    ".cpp", ".cc", ".c", ".cxx", ".asm", ".nasm", ".m", ".mm", ".swift",
];

/// Extensions handed to unities by default.
pub const DEFAULT_BLOB_EXTENSIONS: &[&str] = &[".cpp"];

/// Resource script extension.
pub const RESOURCE_EXTENSION: &str = ".rc";

/// A source file of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    /// Lowercase extension with leading dot
    pub extension: String,
    /// Path relative to the directory the project's bff is written to
    pub relative: String,
}

impl SourceFile {
    pub fn new(path: PathBuf, bff_dir: &Path) -> Self {
        SourceFile {
            extension: dotted_extension(&path),
            relative: relative_slash(bff_dir, &path),
            path,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.extension == RESOURCE_EXTENSION
    }
}

/// A project: a set of source files built in one or more configurations.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Source root
    pub root: PathBuf,
    /// Directory the generated bff is written to
    pub path: PathBuf,
    pub bff_name: String,
    pub additional_source_roots: Vec<PathBuf>,
    /// Sorted by path
    pub source_files: Vec<SourceFile>,
    pub compile_extensions: BTreeSet<String>,
    pub blob_extensions: BTreeSet<String>,
    /// Folders whose files are compiled one by one instead of through unities
    pub blob_exclude_paths: Vec<PathBuf>,
    /// Aggregate "build everything" project
    pub fastbuild_all: bool,
    /// Export-only project: never linked and has no bff of its own
    pub export: bool,
    pub configurations: Vec<ConfId>,
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let root = root.into();
        Project {
            id,
            bff_name: name.clone(),
            name,
            path: root.clone(),
            root,
            additional_source_roots: Vec::new(),
            source_files: Vec::new(),
            compile_extensions: DEFAULT_COMPILE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            blob_extensions: DEFAULT_BLOB_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            blob_exclude_paths: Vec::new(),
            fastbuild_all: false,
            export: false,
            configurations: Vec::new(),
        }
    }

    /// Path of the generated project file.
    pub fn bff_path(&self) -> PathBuf {
        self.path.join(format!("{}.bff", self.bff_name))
    }

    /// Source root followed by the additional roots.
    pub fn source_roots(&self) -> Vec<PathBuf> {
        std::iter::once(self.root.clone())
            .chain(self.additional_source_roots.iter().cloned())
            .collect()
    }

    /// Add a source file; keeps the list sorted and free of duplicates.
    pub fn add_source_file(&mut self, path: impl Into<PathBuf>) {
        let file = SourceFile::new(path.into(), &self.path);
        if let Err(pos) = self
            .source_files
            .binary_search_by(|f| f.path.cmp(&file.path))
        {
            self.source_files.insert(pos, file);
        }
    }

    pub fn is_compiled(&self, file: &SourceFile) -> bool {
        self.compile_extensions.contains(&file.extension)
    }

    pub fn is_blobbable(&self, file: &SourceFile) -> bool {
        self.blob_extensions.contains(&file.extension)
    }
}
