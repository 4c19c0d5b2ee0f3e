//! Implementation of `fastbff targets`.
//!
//! Lists every configuration in the FASTBuild graph with the fbuild command
//! line that builds it.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::platform::platform_bff;
use crate::core::solution::{ConfId, Workspace};
use crate::generator::cache::GenerationCache;
use crate::generator::naming::short_name;
use crate::util::config::Config;
use crate::util::fs::relative_slash;

/// One buildable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetLine {
    /// `Project|Conf|platform`
    pub label: String,
    pub short_name: String,
    pub command: String,
}

/// The fbuild executable: configured, found on PATH, or plain `fbuild`.
pub fn fbuild_executable(config: &Config) -> PathBuf {
    config
        .fastbuild
        .executable
        .clone()
        .or_else(|| which::which("fbuild").ok())
        .unwrap_or_else(|| PathBuf::from("fbuild"))
}

/// `fbuild [-clean] <short-name> <args>` for one configuration.
///
/// The arguments select the master file of the first solution including the
/// project, followed by the configured extra arguments.
pub fn fbuild_command(
    ws: &Workspace,
    conf: ConfId,
    short: &str,
    rebuild: bool,
    config: &Config,
    cache: &GenerationCache,
) -> String {
    cache.command_line(conf, rebuild, || {
        let project = ws.conf(conf).project;
        let mut args = Vec::new();
        if let Some(solution) = ws.solutions().iter().find(|s| s.projects.contains(&project)) {
            let mut master = solution.master_bff.clone().into_os_string();
            master.push(".bff");
            args.push(format!(
                "-config {}",
                relative_slash(&ws.root, &PathBuf::from(master))
            ));
        }
        args.extend(config.fastbuild.extra_args.iter().cloned());

        let clean = if rebuild { " -clean" } else { "" };
        format!(
            "{}{} {} {}",
            fbuild_executable(config).display(),
            clean,
            short,
            args.join(" ")
        )
        .trim_end()
        .to_string()
    })
}

/// Every generated configuration of the workspace.
pub fn list_targets(
    ws: &Workspace,
    config: &Config,
    cache: &GenerationCache,
    rebuild: bool,
) -> Vec<TargetLine> {
    let mut lines = Vec::new();
    for project in ws.projects().iter().filter(|p| !p.export) {
        for &id in &project.configurations {
            let conf = ws.conf(id);
            if !conf.fastbuild {
                continue;
            }
            let Some(platform) = platform_bff(conf.target.platform) else {
                continue;
            };
            if !platform.supports_fastbuild() {
                continue;
            }
            let short = short_name(project, conf, platform);
            lines.push(TargetLine {
                label: ws.conf_label(id),
                command: fbuild_command(ws, id, &short, rebuild, config, cache),
                short_name: short,
            });
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::linked_workspace;
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        let mut config = Config::default();
        config.fastbuild.executable = Some(PathBuf::from("tools/FBuild.exe"));
        config.fastbuild.extra_args = vec!["-dist".to_string()];
        config
    }

    #[test]
    fn test_command_lines() {
        let (ws, _) = linked_workspace();
        let cache = GenerationCache::new();
        let lines = list_targets(&ws, &config(), &cache, false);

        assert_eq!(lines.len(), 4);
        let app = lines.iter().find(|l| l.label == "App|Debug|win64").unwrap();
        assert_eq!(app.short_name, "App_Debug_win64");
        assert_eq!(
            app.command,
            "tools/FBuild.exe App_Debug_win64 -config Game.bff -dist"
        );
    }

    #[test]
    fn test_rebuild_is_cached_separately() {
        let (ws, ids) = linked_workspace();
        let cache = GenerationCache::new();
        let config = config();

        let build = fbuild_command(&ws, ids["Core"], "Core_Debug_win64", false, &config, &cache);
        let rebuild = fbuild_command(&ws, ids["Core"], "Core_Debug_win64", true, &config, &cache);
        assert!(!build.contains("-clean"));
        assert!(rebuild.starts_with("tools/FBuild.exe -clean Core_Debug_win64"));
        assert_eq!(cache.cached_command_lines(), 2);
    }

    #[test]
    fn test_export_projects_are_not_listed() {
        let (mut ws, ids) = linked_workspace();
        let tool = ws.conf(ids["Tool"]).project;
        ws.project_mut(tool).export = true;

        let lines = list_targets(&ws, &config(), &GenerationCache::new(), false);
        assert!(lines.iter().all(|l| !l.label.starts_with("Tool")));
    }
}
