//! Unity naming strategies and short node names.
//!
//! A strategy is chosen once per run. Names depend only on the descriptor,
//! on the set of configurations sharing it, and on the project, never on
//! the order configurations were visited in.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::configuration::Configuration;
use crate::core::platform::PlatformBff;
use crate::core::project::Project;
use crate::core::solution::{ConfId, Workspace};
use crate::core::target::{merge_fragments, FragmentValues, Platform, FRAGMENT_AXES};
use crate::generator::errors::NamingError;
use crate::generator::unity::{UnityDescriptor, UnityGroup};
use crate::util::fs::to_slash;
use crate::util::hash::Fingerprint;

/// How unity nodes are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnityNamingStrategy {
    /// `{project}_unity_{hash of the descriptor}`
    Hash,
    /// `{project}{distinguishing fragments}_unity`
    #[default]
    Fragment,
    /// `{project}_unity_{hash of every fragment}`
    FragmentHash,
}

impl UnityNamingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnityNamingStrategy::Hash => "hash",
            UnityNamingStrategy::Fragment => "fragment",
            UnityNamingStrategy::FragmentHash => "fragment-hash",
        }
    }

    pub fn resolver(&self) -> &'static dyn UnityResolver {
        match self {
            UnityNamingStrategy::Hash => &HashUnityResolver,
            UnityNamingStrategy::Fragment => &FragmentUnityResolver,
            UnityNamingStrategy::FragmentHash => &FragmentHashUnityResolver,
        }
    }
}

impl fmt::Display for UnityNamingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnityNamingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(UnityNamingStrategy::Hash),
            "fragment" => Ok(UnityNamingStrategy::Fragment),
            "fragment-hash" | "fragment_hash" => Ok(UnityNamingStrategy::FragmentHash),
            other => Err(format!(
                "unknown unity naming strategy `{}` (expected hash, fragment or fragment-hash)",
                other
            )),
        }
    }
}

/// Everything a resolver may look at to name one unity.
#[derive(Debug)]
pub struct UnityNamingInput<'a> {
    pub project: &'a str,
    pub descriptor: &'a UnityDescriptor,
    /// Sorted names of the configurations sharing the unity
    pub configuration_names: Vec<&'a str>,
    /// OR-merge of the sharing configurations' fragments
    pub fragments: FragmentValues,
    /// OR-merge over every FASTBuild configuration of the project
    pub project_fragments: FragmentValues,
}

/// Assigns a unity name.
pub trait UnityResolver: Send + Sync {
    fn unity_name(&self, input: &UnityNamingInput<'_>) -> String;
}

/// Hash of the descriptor, its output path and the sharing configurations.
///
/// Unstable across machines when isolate-writable-files differs.
#[derive(Debug, Clone, Copy)]
pub struct HashUnityResolver;

impl UnityResolver for HashUnityResolver {
    fn unity_name(&self, input: &UnityNamingInput<'_>) -> String {
        let mut fp = Fingerprint::new();
        input.descriptor.fingerprint(&mut fp);
        fp.update_str(&input.descriptor.output_path)
            .update_str(&input.configuration_names.join(","));
        format!("{}_unity_{}", input.project, fp.finish_hex8())
    }
}

/// Only the fragments that set the unity apart from the whole project.
#[derive(Debug, Clone, Copy)]
pub struct FragmentUnityResolver;

impl UnityResolver for FragmentUnityResolver {
    fn unity_name(&self, input: &UnityNamingInput<'_>) -> String {
        let fragments = fragment_string(&input.fragments, Some(&input.project_fragments));
        format!("{}{}_unity", input.project, fragments)
    }
}

/// Every fragment, hashed.
#[derive(Debug, Clone, Copy)]
pub struct FragmentHashUnityResolver;

impl UnityResolver for FragmentHashUnityResolver {
    fn unity_name(&self, input: &UnityNamingInput<'_>) -> String {
        let fragments = fragment_string(&input.fragments, None);
        let mut fp = Fingerprint::new();
        fp.update_str(&fragments)
            .update_u64(u64::from(input.descriptor.section_bucket));
        format!("{}_unity_{}", input.project, fp.finish_hex8())
    }
}

static UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("_+").expect("underscore pattern"));

/// Replace spaces, colons, periods and commas with `_`, collapsing runs.
pub fn sanitize(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| match c {
            ' ' | ':' | '.' | ',' => '_',
            c => c,
        })
        .collect();
    UNDERSCORES.replace_all(&replaced, "_").into_owned()
}

/// `_`-prefixed rendering of each axis, skipping axes equal to `baseline`.
fn fragment_string(values: &FragmentValues, baseline: Option<&FragmentValues>) -> String {
    let mut out = String::new();
    for (i, axis) in FRAGMENT_AXES.iter().enumerate() {
        if baseline.is_some_and(|b| b[i] == values[i]) {
            continue;
        }
        out.push('_');
        out.push_str(&axis.render(values[i]));
    }
    sanitize(&out)
}

/// Output pattern of a unity named `name`.
pub fn output_pattern(name: &str) -> String {
    format!("{}*.cpp", name.to_lowercase())
}

/// Expand `pattern` into one file name per shard, numbered from 1.
pub fn expand_shards(
    unity: &str,
    pattern: &str,
    count: Option<u32>,
) -> Result<Vec<String>, NamingError> {
    let parts: Vec<&str> = pattern.split('*').collect();
    let (prefix, suffix) = match parts.as_slice() {
        [_] => {
            return Err(NamingError::MissingWildcard {
                unity: unity.to_string(),
                pattern: pattern.to_string(),
            })
        }
        [prefix, suffix] => (*prefix, *suffix),
        _ => {
            return Err(NamingError::MultipleWildcards {
                unity: unity.to_string(),
                pattern: pattern.to_string(),
            })
        }
    };
    Ok((1..=count.unwrap_or(1))
        .map(|i| format!("{}{}{}", prefix, i, suffix))
        .collect())
}

/// A unity with its name assigned.
#[derive(Debug, Clone)]
pub struct ResolvedUnity {
    pub name: String,
    pub output_pattern: String,
    pub descriptor: UnityDescriptor,
    pub configurations: Vec<ConfId>,
    /// Shard paths relative to the project bff directory
    pub shard_files: Vec<String>,
}

/// Name every unity of `project`. The result is sorted by name.
pub fn resolve_unities(
    ws: &Workspace,
    project: &Project,
    group: &UnityGroup,
    strategy: UnityNamingStrategy,
) -> Result<Vec<ResolvedUnity>, NamingError> {
    let resolver = strategy.resolver();
    let project_fragments = merge_fragments(
        project
            .configurations
            .iter()
            .map(|&id| ws.conf(id))
            .filter(|c| c.fastbuild)
            .map(|c| c.target.fragment_values())
            .collect::<Vec<_>>()
            .iter(),
    );

    let mut by_name: BTreeMap<String, ResolvedUnity> = BTreeMap::new();
    for (descriptor, confs) in group.iter() {
        let mut configuration_names: Vec<&str> =
            confs.iter().map(|&id| ws.conf(id).name.as_str()).collect();
        configuration_names.sort_unstable();
        configuration_names.dedup();
        let fragments = merge_fragments(
            confs
                .iter()
                .map(|&id| ws.conf(id).target.fragment_values())
                .collect::<Vec<_>>()
                .iter(),
        );

        let input = UnityNamingInput {
            project: &project.name,
            descriptor,
            configuration_names,
            fragments,
            project_fragments,
        };
        let name = resolver.unity_name(&input);
        if by_name.contains_key(&name) {
            return Err(NamingError::NameCollision {
                project: project.name.clone(),
                name,
            });
        }

        let pattern = output_pattern(&name);
        let shard_files = expand_shards(&name, &pattern, descriptor.num_files)?
            .into_iter()
            .map(|shard| format!("{}/{}", descriptor.output_path, shard))
            .collect();

        tracing::debug!("unity `{}` serves {} configurations", name, confs.len());
        by_name.insert(
            name.clone(),
            ResolvedUnity {
                name,
                output_pattern: pattern,
                descriptor: descriptor.clone(),
                configurations: confs.clone(),
                shard_files,
            },
        );
    }

    Ok(by_name.into_values().collect())
}

/// Short node name: `Project_Conf_platform`.
///
/// Platforms other than win64 append their toolchain platform string when it
/// differs from the simple name, keeping names distinct across platforms.
pub fn short_name(project: &Project, conf: &Configuration, platform: &dyn PlatformBff) -> String {
    let mut platform_string = platform.simple_name().to_string();
    if conf.target.platform != Platform::WIN64 {
        let full = platform.full_platform_string().to_lowercase();
        if !full.eq_ignore_ascii_case(&platform_string) {
            platform_string = format!("{}_{}", platform_string, full);
        }
    }
    let dirty = format!("{}_{}_{}", project.name, conf.name, platform_string);
    dirty
        .split([' ', ':', '.'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Short name of a configuration whose platform may lack an adapter.
pub fn short_name_of(ws: &Workspace, conf: ConfId) -> String {
    let c = ws.conf(conf);
    let project = ws.project(c.project);
    match crate::core::platform::platform_bff(c.target.platform) {
        Some(platform) => short_name(project, c, platform),
        None => sanitize(&format!("{}_{}_{}", project.name, c.name, c.target.platform)),
    }
}

/// Copy node alias: `Copy_{file}_{hash of the destination}`.
pub fn copy_alias(file_name: &str, destination: &std::path::Path) -> String {
    let mut fp = Fingerprint::new();
    fp.update_str(&to_slash(destination).to_lowercase());
    format!("Copy_{}_{}", sanitize(file_name), fp.finish_hex8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::platform_bff;
    use crate::core::target::{DevEnv, Optimization, Target};
    use crate::test_support::fixtures::blobbed_workspace;
    use pretty_assertions::assert_eq;

    fn descriptor() -> UnityDescriptor {
        UnityDescriptor {
            output_path: "unity".to_string(),
            input_paths: vec![".".to_string()],
            input_files: Vec::new(),
            exclude_paths: Vec::new(),
            excluded_files: Vec::new(),
            input_pattern: Vec::new(),
            isolate_writable_files: false,
            isolate_writable_files_limit: None,
            num_files: Some(2),
            pch: None,
            section_bucket: 0,
        }
    }

    fn with_targets(targets: &[(&str, Target)]) -> (Workspace, Vec<ConfId>) {
        let (mut ws, p) = blobbed_workspace("SimpleProject", &["a.cpp"]);
        let mut ids = vec![ws.project(p).configurations[0]];
        for (name, target) in targets {
            let id = ws.add_configuration(p, *name, *target).id;
            ws.conf_mut(id).blob.fastbuild_blobbed = true;
            ids.push(id);
        }
        (ws, ids)
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("hash".parse(), Ok(UnityNamingStrategy::Hash));
        assert_eq!("Fragment".parse(), Ok(UnityNamingStrategy::Fragment));
        assert_eq!(
            "fragment-hash".parse(),
            Ok(UnityNamingStrategy::FragmentHash)
        );
        assert!("md5".parse::<UnityNamingStrategy>().is_err());
        assert_eq!(UnityNamingStrategy::default(), UnityNamingStrategy::Fragment);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Debug, Release"), "Debug_Release");
        assert_eq!(sanitize("a:b.c  d"), "a_b_c_d");
    }

    #[test]
    fn test_expand_shards() {
        assert_eq!(
            expand_shards("u", "core_unity*.cpp", Some(3)).unwrap(),
            vec!["core_unity1.cpp", "core_unity2.cpp", "core_unity3.cpp"]
        );
        assert_eq!(expand_shards("u", "x*.cpp", None).unwrap(), vec!["x1.cpp"]);
        assert!(matches!(
            expand_shards("u", "core.cpp", Some(2)),
            Err(NamingError::MissingWildcard { .. })
        ));
        assert!(matches!(
            expand_shards("u", "a*b*.cpp", Some(2)),
            Err(NamingError::MultipleWildcards { .. })
        ));
    }

    #[test]
    fn test_fragment_name_names_distinguishing_axes() {
        let (ws, ids) = with_targets(&[
            (
                "Release",
                Target {
                    dev_env: DevEnv::VS2017,
                    optimization: Optimization::RELEASE,
                    ..Target::default()
                },
            ),
            (
                "Debug",
                Target {
                    dev_env: DevEnv::VS2017,
                    ..Target::default()
                },
            ),
            (
                "Retail",
                Target {
                    optimization: Optimization::RETAIL,
                    ..Target::default()
                },
            ),
        ]);
        let mut group = UnityGroup::new();
        let mut vs2017 = descriptor();
        vs2017.section_bucket = 1;
        group.insert(vs2017.clone(), ids[1]);
        group.insert(vs2017, ids[2]);
        group.insert(descriptor(), ids[0]);
        group.insert(descriptor(), ids[3]);

        let project = ws.project(ws.conf(ids[0]).project);
        let resolved =
            resolve_unities(&ws, project, &group, UnityNamingStrategy::Fragment).unwrap();
        let names: Vec<_> = resolved.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "SimpleProject_vs2017_Debug_Release_unity",
                "SimpleProject_vs2019_Debug_Retail_unity",
            ]
        );
        assert_eq!(
            resolved[0].output_pattern,
            "simpleproject_vs2017_debug_release_unity*.cpp"
        );
        assert_eq!(resolved[0].shard_files.len(), 2);
    }

    #[test]
    fn test_names_ignore_configuration_order() {
        let release = Target {
            optimization: Optimization::RELEASE,
            ..Target::default()
        };
        let (ws, ids) = with_targets(&[("Release", release)]);
        let project = ws.project(ws.conf(ids[0]).project);

        for strategy in [
            UnityNamingStrategy::Hash,
            UnityNamingStrategy::Fragment,
            UnityNamingStrategy::FragmentHash,
        ] {
            let mut forward = UnityGroup::new();
            forward.insert(descriptor(), ids[0]);
            forward.insert(descriptor(), ids[1]);
            let mut backward = UnityGroup::new();
            backward.insert(descriptor(), ids[1]);
            backward.insert(descriptor(), ids[0]);

            let a = resolve_unities(&ws, project, &forward, strategy).unwrap();
            let b = resolve_unities(&ws, project, &backward, strategy).unwrap();
            let again = resolve_unities(&ws, project, &forward, strategy).unwrap();
            assert_eq!(a[0].name, b[0].name, "{}", strategy);
            assert_eq!(a[0].name, again[0].name, "{}", strategy);
        }
    }

    #[test]
    fn test_shared_unity_for_debug_and_release() {
        let release = Target {
            optimization: Optimization::RELEASE,
            ..Target::default()
        };
        let (ws, ids) = with_targets(&[("Release", release)]);
        let project = ws.project(ws.conf(ids[0]).project);
        let mut group = UnityGroup::new();
        group.insert(descriptor(), ids[0]);
        group.insert(descriptor(), ids[1]);

        let resolved =
            resolve_unities(&ws, project, &group, UnityNamingStrategy::Fragment).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].configurations, vec![ids[0], ids[1]]);
        assert_eq!(resolved[0].name, "SimpleProject_unity");
    }

    #[test]
    fn test_hash_name_shape() {
        let (ws, ids) = with_targets(&[]);
        let project = ws.project(ws.conf(ids[0]).project);
        let mut group = UnityGroup::new();
        group.insert(descriptor(), ids[0]);

        let resolved = resolve_unities(&ws, project, &group, UnityNamingStrategy::Hash).unwrap();
        let name = &resolved[0].name;
        assert!(name.starts_with("SimpleProject_unity_"));
        let hex = name.trim_start_matches("SimpleProject_unity_");
        assert_eq!(hex.len(), 8);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_fragment_collision_is_an_error() {
        let (ws, ids) = with_targets(&[]);
        let project = ws.project(ws.conf(ids[0]).project);
        let mut other = descriptor();
        other.num_files = Some(4);
        let mut group = UnityGroup::new();
        group.insert(descriptor(), ids[0]);
        group.insert(other, ids[0]);

        let err = resolve_unities(&ws, project, &group, UnityNamingStrategy::Fragment)
            .unwrap_err();
        assert!(matches!(err, NamingError::NameCollision { .. }));
    }

    #[test]
    fn test_short_names() {
        let (mut ws, ids) = with_targets(&[]);
        let conf = ids[0];
        let p = ws.conf(conf).project;
        ws.conf_mut(conf).name = "Debug Fast".to_string();
        let c = ws.conf(conf);
        assert_eq!(
            short_name(ws.project(p), c, platform_bff(Platform::WIN64).unwrap()),
            "SimpleProject_Debug_Fast_win64"
        );

        let linux = ws
            .add_configuration(
                p,
                "Debug",
                Target {
                    platform: Platform::LINUX,
                    ..Target::default()
                },
            )
            .id;
        assert_eq!(short_name_of(&ws, linux), "SimpleProject_Debug_linux");

        let android = ws
            .add_configuration(
                p,
                "Debug",
                Target {
                    platform: Platform::ANDROID,
                    ..Target::default()
                },
            )
            .id;
        assert_eq!(short_name_of(&ws, android), "SimpleProject_Debug_android_arm64");
    }

    #[test]
    fn test_copy_alias_is_stable() {
        let a = copy_alias("app.exe", std::path::Path::new("/out/bin"));
        let b = copy_alias("app.exe", std::path::Path::new("/OUT/bin"));
        assert_eq!(a, b);
        assert!(a.starts_with("Copy_app_exe_"));
    }
}
