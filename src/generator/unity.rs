//! Unity aggregation.
//!
//! Each FASTBuild-blobbed configuration turns its default bucket into a
//! [`UnityDescriptor`]. Descriptors compare structurally, so configurations
//! with identical source layout and blob settings share one unity node.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::core::configuration::{Configuration, InputFileStrategy};
use crate::core::project::{Project, SourceFile};
use crate::core::solution::ConfId;
use crate::generator::subconfig::SubConfigPartition;
use crate::util::fs::{is_inside_any, relative_slash};
use crate::util::hash::Fingerprint;

/// Extension FASTBuild aggregates when no input pattern is given.
pub const DEFAULT_UNITY_EXTENSION: &str = ".cpp";

/// Identity of a unity node. Names are assigned later and are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnityDescriptor {
    /// Output directory, relative to the project bff directory
    pub output_path: String,
    pub input_paths: Vec<String>,
    pub input_files: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub excluded_files: Vec<String>,
    /// `*ext` patterns, empty for the FASTBuild default of `*.cpp`
    pub input_pattern: Vec<String>,
    pub isolate_writable_files: bool,
    pub isolate_writable_files_limit: Option<u32>,
    pub num_files: Option<u32>,
    pub pch: Option<String>,
    pub section_bucket: u8,
}

impl UnityDescriptor {
    /// Feed every identity field into `fp`.
    pub fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.update_str(&self.output_path)
            .update_strs(self.input_paths.iter().map(String::as_str))
            .update_strs(self.input_files.iter().map(String::as_str))
            .update_strs(self.exclude_paths.iter().map(String::as_str))
            .update_strs(self.excluded_files.iter().map(String::as_str))
            .update_strs(self.input_pattern.iter().map(String::as_str))
            .update_bool(self.isolate_writable_files)
            .update_u64(self.isolate_writable_files_limit.map_or(0, u64::from))
            .update_u64(self.num_files.map_or(0, u64::from))
            .update_opt(self.pch.as_deref())
            .update_u64(u64::from(self.section_bucket));
    }
}

/// Descriptors of one project and the configurations sharing each.
#[derive(Debug, Clone, Default)]
pub struct UnityGroup {
    entries: IndexMap<UnityDescriptor, Vec<ConfId>>,
}

impl UnityGroup {
    pub fn new() -> Self {
        UnityGroup::default()
    }

    /// Add `conf` to the group of `descriptor`, creating it if unseen.
    pub fn insert(&mut self, descriptor: UnityDescriptor, conf: ConfId) {
        let confs = self.entries.entry(descriptor).or_default();
        if !confs.contains(&conf) {
            confs.push(conf);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnityDescriptor, &Vec<ConfId>)> {
        self.entries.iter()
    }

    /// Descriptor serving `conf`.
    pub fn descriptor_of(&self, conf: ConfId) -> Option<&UnityDescriptor> {
        self.entries
            .iter()
            .find(|(_, confs)| confs.contains(&conf))
            .map(|(d, _)| d)
    }
}

pub(crate) fn is_precomp_source(conf: &Configuration, file: &SourceFile) -> bool {
    conf.precomp
        .source
        .as_deref()
        .is_some_and(|src| file.path.ends_with(src))
}

/// Files of `bucket` that a unity of `conf` aggregates.
pub fn unity_files<'a>(
    project: &Project,
    conf: &Configuration,
    bucket: &'a [SourceFile],
) -> Vec<&'a SourceFile> {
    bucket
        .iter()
        .filter(|file| {
            project.is_blobbable(file)
                && !is_precomp_source(conf, file)
                && !conf.files.blob_exclude.contains(&file.path)
        })
        .collect()
}

fn relative_all(base: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
    paths.into_iter().map(|p| relative_slash(base, &p)).collect()
}

/// Build the unity descriptor of `conf` from its default bucket.
///
/// Returns `None` when `conf` is not FASTBuild-blobbed or has nothing to
/// aggregate; an empty default bucket is then dropped from `partition`.
pub fn configure_unity(
    project: &Project,
    conf: &Configuration,
    partition: &mut SubConfigPartition,
) -> Option<UnityDescriptor> {
    if !conf.blob.fastbuild_blobbed {
        return None;
    }
    let bucket = partition.default_bucket()?;
    let bff_dir = project.path.as_path();

    let mut roots = project.source_roots();
    let mut exclude_roots: Vec<PathBuf> = project.blob_exclude_paths.clone();

    let eligible = unity_files(project, conf, bucket);
    let sources_found = !eligible.is_empty();
    let listed: Vec<String> = eligible
        .iter()
        .filter(|f| {
            conf.blob.strategy == InputFileStrategy::Include || !is_inside_any(&f.path, &roots)
        })
        .map(|f| f.relative.clone())
        .collect();

    let mut input_paths = Vec::new();
    let mut excluded_files = Vec::new();
    let input_files = if listed.is_empty() && !sources_found {
        Vec::new()
    } else if conf.blob.strategy == InputFileStrategy::Include {
        listed
    } else {
        if let Some(blob_path) = &conf.blob.blob_path {
            if is_inside_any(blob_path, &roots) {
                exclude_roots.push(blob_path.clone());
            }
        }
        roots.retain(|r| !exclude_roots.contains(r));
        input_paths = relative_all(bff_dir, roots.iter().cloned());

        let mut excluded: Vec<&PathBuf> = conf
            .files
            .blob_exclude
            .iter()
            .chain(&conf.files.build_exclude)
            .chain(&conf.precomp.exclude)
            .collect();
        excluded.sort();
        excluded.dedup();
        excluded_files = excluded
            .into_iter()
            .filter(|f| is_inside_any(f, &roots))
            .map(|f| relative_slash(bff_dir, f))
            .collect();

        listed
    };

    if input_files.is_empty() && input_paths.is_empty() {
        partition.remove_empty_default();
        return None;
    }

    let input_pattern = if project.blob_extensions.len() == 1
        && project.blob_extensions.contains(DEFAULT_UNITY_EXTENSION)
    {
        Vec::new()
    } else {
        project
            .blob_extensions
            .iter()
            .map(|ext| format!("*{}", ext))
            .collect()
    };

    let output_dir = conf
        .blob
        .unity_path
        .clone()
        .unwrap_or_else(|| project.path.join("unity"));

    Some(UnityDescriptor {
        output_path: relative_slash(bff_dir, &output_dir),
        input_paths,
        input_files,
        exclude_paths: relative_all(bff_dir, exclude_roots),
        excluded_files,
        input_pattern,
        isolate_writable_files: conf.blob.isolate_writable_files,
        isolate_writable_files_limit: conf
            .blob
            .isolate_writable_files
            .then_some(conf.blob.isolate_writable_files_limit)
            .flatten(),
        num_files: conf.blob.shard_count(),
        pch: conf.precomp.header.clone(),
        section_bucket: conf.blob.section_bucket,
    })
}
