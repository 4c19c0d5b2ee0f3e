//! Sub-configuration partitioning.
//!
//! A configuration's files are grouped by the compile options they need.
//! Each group becomes its own object list; the default group (plain C++ with
//! the precompiled header) is the one unities are built from. Buckets keep
//! first-seen order because the last bucket produces the final artifact.

use indexmap::IndexMap;

use crate::core::configuration::{Configuration, ExceptionMode, LanguageFeatures, Languages};
use crate::core::platform::PlatformBff;
use crate::core::project::{Project, SourceFile};
use crate::generator::errors::{ConfigurationError, GenerateError, ToolingGap};

/// Effective compile options shared by every file of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubConfigKey {
    pub use_precompiled_header: bool,
    pub languages: Languages,
    pub features: LanguageFeatures,
    pub exceptions: ExceptionMode,
}

impl Default for SubConfigKey {
    fn default() -> Self {
        SubConfigKey {
            use_precompiled_header: true,
            languages: Languages::empty(),
            features: LanguageFeatures::empty(),
            exceptions: ExceptionMode::Disable,
        }
    }
}

impl SubConfigKey {
    pub fn is_default(&self) -> bool {
        *self == SubConfigKey::default()
    }

    pub fn is_c(&self) -> bool {
        self.languages.contains(Languages::C)
    }
}

/// Buckets of one configuration, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SubConfigPartition {
    buckets: IndexMap<SubConfigKey, Vec<SourceFile>>,
    non_default_files: Vec<SourceFile>,
}

impl SubConfigPartition {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubConfigKey, &Vec<SourceFile>)> {
        self.buckets.iter()
    }

    pub fn get(&self, key: &SubConfigKey) -> Option<&Vec<SourceFile>> {
        self.buckets.get(key)
    }

    pub fn default_bucket(&self) -> Option<&Vec<SourceFile>> {
        self.buckets.get(&SubConfigKey::default())
    }

    /// Files that landed outside the default bucket.
    pub fn non_default_files(&self) -> &[SourceFile] {
        &self.non_default_files
    }

    /// Drop the default bucket if it holds no file.
    pub fn remove_empty_default(&mut self) {
        let key = SubConfigKey::default();
        if self.buckets.get(&key).is_some_and(|files| files.is_empty()) {
            self.buckets.shift_remove(&key);
        }
    }

    fn insert(&mut self, key: SubConfigKey, file: SourceFile) {
        if !key.is_default() {
            self.non_default_files.push(file.clone());
        }
        self.buckets.entry(key).or_default().push(file);
    }

    fn ensure_default(&mut self) {
        self.buckets.entry(SubConfigKey::default()).or_default();
    }
}

fn conflict(conf_label: &str, file: &SourceFile, detail: impl Into<String>) -> GenerateError {
    ConfigurationError::ConflictingOverrides {
        configuration: conf_label.to_string(),
        file: file.relative.clone(),
        detail: detail.into(),
    }
    .into()
}

/// Languages implied by a file extension.
pub(crate) fn extension_languages(extension: &str) -> Languages {
    match extension {
        ".c" => Languages::C,
        ".asm" => Languages::ASM,
        ".nasm" => Languages::NASM,
        ".swift" => Languages::SWIFT,
        ".m" => Languages::OBJC,
        ".mm" => Languages::OBJCPP,
        _ => Languages::empty(),
    }
}

/// Compute the bucket key of one file.
pub fn key_for_file(
    conf: &Configuration,
    conf_label: &str,
    file: &SourceFile,
    platform: &dyn PlatformBff,
) -> Result<SubConfigKey, GenerateError> {
    let path = file.path.as_path();
    let overrides = &conf.files;

    let mut no_pch = conf.precomp.excludes(path, &file.extension);

    let mut explicit = Languages::empty();
    for (list, lang) in [
        (&overrides.compile_as_c, Languages::C),
        (&overrides.compile_as_cpp, Languages::CPP),
        (&overrides.compile_as_objc, Languages::OBJC),
        (&overrides.compile_as_objcpp, Languages::OBJCPP),
    ] {
        if list.contains(path) {
            explicit |= lang;
        }
    }
    if explicit.bits().count_ones() > 1 {
        return Err(conflict(
            conf_label,
            file,
            format!("listed as several languages ({:?})", explicit),
        ));
    }

    let implied = extension_languages(&file.extension);
    let assembled = Languages::ASM | Languages::NASM | Languages::SWIFT;
    let mut languages = if implied.intersects(assembled) {
        if !explicit.is_empty() {
            return Err(conflict(
                conf_label,
                file,
                format!("`{}` files cannot be compiled as {:?}", file.extension, explicit),
            ));
        }
        implied
    } else if !explicit.is_empty() {
        explicit
    } else {
        implied
    };

    if languages.contains(Languages::SWIFT) && !platform.supports_swift() {
        return Err(ToolingGap {
            configuration: conf_label.to_string(),
            platform: platform.simple_name().to_string(),
            reason: format!("`{}` is Swift, which the platform does not compile", file.relative),
        }
        .into());
    }

    if file.extension == ".c" {
        languages = Languages::C;
        no_pch = true;
    } else if languages.contains(Languages::C) {
        no_pch = true;
    }

    let mut features = LanguageFeatures::empty();
    if overrides.compile_as_clr.contains(path) {
        features |= LanguageFeatures::CLR;
    }
    if overrides.compile_as_non_clr.contains(path) {
        features |= LanguageFeatures::NON_CLR;
    }
    if overrides.consume_winrt.contains(path) && !overrides.exclude_winrt.contains(path) {
        features |= LanguageFeatures::CONSUME_WINRT;
    }

    if features.contains(LanguageFeatures::CLR | LanguageFeatures::NON_CLR) {
        return Err(conflict(conf_label, file, "compiled both as CLR and as non-CLR"));
    }
    if features.contains(LanguageFeatures::CLR)
        && languages.intersects(Languages::OBJC | Languages::OBJCPP | assembled)
    {
        return Err(conflict(
            conf_label,
            file,
            format!("CLR cannot compile {:?}", languages),
        ));
    }
    if languages.contains(Languages::C) && features.contains(LanguageFeatures::CONSUME_WINRT) {
        return Err(ConfigurationError::CFileConsumesWinRt {
            configuration: conf_label.to_string(),
            file: file.relative.clone(),
        }
        .into());
    }
    if features.intersects(LanguageFeatures::CLR | LanguageFeatures::CONSUME_WINRT) {
        no_pch = true;
    }

    let mut exceptions = ExceptionMode::Disable;
    let mut exception_lists = 0;
    for (list, mode) in [
        (&overrides.exceptions_enabled, ExceptionMode::Enable),
        (
            &overrides.exceptions_enabled_extern_c,
            ExceptionMode::EnableWithExternC,
        ),
        (&overrides.exceptions_enabled_seh, ExceptionMode::EnableWithSeh),
    ] {
        if list.contains(path) {
            exceptions = mode;
            exception_lists += 1;
        }
    }
    if exception_lists > 1 {
        return Err(conflict(conf_label, file, "listed in several exception modes"));
    }

    Ok(SubConfigKey {
        use_precompiled_header: !no_pch,
        languages,
        features,
        exceptions,
    })
}

/// Partition the compiled files of `project` for `conf`.
///
/// Build-excluded files and resource scripts are skipped. When the
/// configuration is FASTBuild-blobbed and the project has files (or builds
/// everything), the default bucket exists even if empty.
pub fn partition(
    project: &Project,
    conf: &Configuration,
    conf_label: &str,
    platform: &dyn PlatformBff,
) -> Result<SubConfigPartition, GenerateError> {
    let _span = tracing::debug_span!("partition", configuration = conf_label).entered();
    let mut result = SubConfigPartition::default();

    for file in &project.source_files {
        if file.is_resource() || !project.is_compiled(file) {
            continue;
        }
        if conf.files.build_exclude.contains(&file.path) {
            continue;
        }
        let key = key_for_file(conf, conf_label, file, platform)?;
        result.insert(key, file.clone());
    }

    if conf.blob.fastbuild_blobbed && (!project.source_files.is_empty() || project.fastbuild_all) {
        result.ensure_default();
    }

    tracing::debug!(
        "{}: {} sub-configurations, {} files outside the default",
        conf_label,
        result.len(),
        result.non_default_files.len()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::platform_bff;
    use crate::core::solution::{ProjectId, Workspace};
    use crate::core::target::{Platform, Target};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn fixture(files: &[&str]) -> (Workspace, ProjectId) {
        let mut ws = Workspace::new("/ws");
        let p = ws.add_project("P", "/ws/p");
        for f in files {
            ws.project_mut(p).add_source_file(format!("/ws/p/{}", f));
        }
        ws.add_configuration(p, "Debug", Target::default());
        (ws, p)
    }

    fn run(ws: &Workspace, p: ProjectId) -> Result<SubConfigPartition, GenerateError> {
        let project = ws.project(p);
        let conf = ws.conf(project.configurations[0]);
        let platform = platform_bff(conf.target.platform).unwrap();
        partition(project, conf, "P|Debug|win64", platform)
    }

    fn set(paths: &[&str]) -> BTreeSet<PathBuf> {
        paths.iter().map(|p| PathBuf::from(format!("/ws/p/{}", p))).collect()
    }

    #[test]
    fn test_partition_is_total() {
        let (mut ws, p) = fixture(&["a.cpp", "b.c", "c.cpp", "d.asm", "e.cpp", "f.rc"]);
        let conf = ws.project(p).configurations[0];
        ws.conf_mut(conf).files.build_exclude = set(&["e.cpp"]);
        ws.conf_mut(conf).files.exceptions_enabled = set(&["c.cpp"]);

        let partition = run(&ws, p).unwrap();

        let mut seen: Vec<String> = partition
            .iter()
            .flat_map(|(_, files)| files.iter().map(|f| f.relative.clone()))
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["a.cpp", "b.c", "c.cpp", "d.asm"]);
        assert_eq!(partition.len(), 4);
        assert_eq!(partition.non_default_files().len(), 3);
    }

    #[test]
    fn test_c_files_disable_pch() {
        let (ws, p) = fixture(&["a.cpp", "b.c"]);
        let partition = run(&ws, p).unwrap();

        let keys: Vec<&SubConfigKey> = partition.iter().map(|(k, _)| k).collect();
        assert!(keys[0].is_default());
        assert!(keys[1].is_c());
        assert!(!keys[1].use_precompiled_header);
    }

    #[test]
    fn test_first_seen_order() {
        let (ws, p) = fixture(&["a.c", "b.cpp", "c.c"]);
        let partition = run(&ws, p).unwrap();

        let first = partition.iter().next().unwrap();
        assert!(first.0.is_c());
        assert_eq!(first.1.len(), 2);
    }

    #[test]
    fn test_default_bucket_exists_when_blobbed() {
        let (mut ws, p) = fixture(&["b.c"]);
        let conf = ws.project(p).configurations[0];
        ws.conf_mut(conf).blob.fastbuild_blobbed = true;

        let partition = run(&ws, p).unwrap();
        assert_eq!(partition.default_bucket().map(Vec::len), Some(0));

        let mut partition = partition;
        partition.remove_empty_default();
        assert!(partition.default_bucket().is_none());
    }

    #[test]
    fn test_default_bucket_for_empty_build_all_project() {
        let (mut ws, p) = fixture(&[]);
        ws.project_mut(p).fastbuild_all = true;
        let conf = ws.project(p).configurations[0];
        ws.conf_mut(conf).blob.fastbuild_blobbed = true;

        let partition = run(&ws, p).unwrap();
        assert!(partition.default_bucket().is_some());
    }

    #[test]
    fn test_clr_and_winrt_disable_pch() {
        let (mut ws, p) = fixture(&["a.cpp", "b.cpp", "c.cpp"]);
        let conf = ws.project(p).configurations[0];
        ws.conf_mut(conf).files.compile_as_clr = set(&["a.cpp"]);
        ws.conf_mut(conf).files.consume_winrt = set(&["b.cpp", "c.cpp"]);
        ws.conf_mut(conf).files.exclude_winrt = set(&["c.cpp"]);

        let partition = run(&ws, p).unwrap();
        for (key, files) in partition.iter() {
            let names: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
            if names == ["c.cpp"] {
                assert!(key.is_default());
            } else {
                assert!(!key.use_precompiled_header, "{:?} should not use pch", names);
            }
        }
    }

    #[test]
    fn test_c_file_consuming_winrt_is_fatal() {
        let (mut ws, p) = fixture(&["b.c"]);
        let conf = ws.project(p).configurations[0];
        ws.conf_mut(conf).files.consume_winrt = set(&["b.c"]);

        let err = run(&ws, p).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Configuration(ConfigurationError::CFileConsumesWinRt { .. })
        ));
    }

    #[test]
    fn test_conflicting_language_overrides_are_fatal() {
        let (mut ws, p) = fixture(&["a.cpp"]);
        let conf = ws.project(p).configurations[0];
        ws.conf_mut(conf).files.compile_as_objc = set(&["a.cpp"]);
        ws.conf_mut(conf).files.compile_as_clr = set(&["a.cpp"]);

        let err = run(&ws, p).unwrap_err();
        assert!(err.to_string().contains("conflicting overrides"));
    }

    #[test]
    fn test_swift_without_support_is_a_tooling_gap() {
        let (ws, p) = fixture(&["view.swift"]);
        let err = run(&ws, p).unwrap_err();
        assert!(!err.is_fatal());

        let (mut ws, p) = fixture(&["view.swift"]);
        let conf = ws.project(p).configurations[0];
        ws.conf_mut(conf).target.platform = Platform::MAC;
        let project = ws.project(p);
        let conf = ws.conf(conf);
        let partition = partition(project, conf, "P|Debug|mac", platform_bff(Platform::MAC).unwrap())
            .unwrap();
        assert!(partition.iter().next().unwrap().0.languages.contains(Languages::SWIFT));
    }

    #[test]
    fn test_precomp_exclusions() {
        let (mut ws, p) = fixture(&["a.cpp", "third_party/z.cpp"]);
        let conf = ws.project(p).configurations[0];
        ws.conf_mut(conf).precomp.exclude_folders = vec![PathBuf::from("/ws/p/third_party")];

        let partition = run(&ws, p).unwrap();
        let (key, files) = partition.iter().nth(1).unwrap();
        assert!(!key.use_precompiled_header);
        assert_eq!(files[0].relative, "third_party/z.cpp");
    }
}
