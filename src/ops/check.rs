//! Implementation of `fastbff check`.

use crate::core::solution::Workspace;
use crate::generator::cache::GenerationCache;
use crate::generator::errors::{GenerateError, ToolingGap};
use crate::generator::naming::UnityNamingStrategy;
use crate::ops::generate::plan_generation;
use crate::util::config::Config;

/// Summary of a workspace that generated cleanly.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub projects: usize,
    pub configurations: usize,
    pub unity_files: usize,
    pub files: usize,
    pub skipped: Vec<ToolingGap>,
}

/// Run every generation phase without writing anything.
pub fn check(
    ws: &Workspace,
    config: &Config,
    strategy: UnityNamingStrategy,
) -> Result<CheckReport, GenerateError> {
    let plan = plan_generation(ws, config, &GenerationCache::new(), strategy, &|_| {})?;
    Ok(CheckReport {
        projects: ws.projects().len(),
        configurations: plan.configurations.len(),
        unity_files: plan.unity_count,
        files: plan.files.len(),
        skipped: plan.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::{Platform, Target};
    use crate::test_support::fixtures::linked_workspace;

    #[test]
    fn test_check_counts() {
        let (ws, _) = linked_workspace();
        let report = check(&ws, &Config::default(), UnityNamingStrategy::Fragment).unwrap();

        assert_eq!(report.projects, 4);
        assert_eq!(report.configurations, 4);
        assert_eq!(report.unity_files, 0);
        assert_eq!(report.files, 6);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_check_reports_skipped_platforms() {
        let (mut ws, ids) = linked_workspace();
        let tool = ws.conf(ids["Tool"]).project;
        ws.add_configuration(
            tool,
            "Debug",
            Target {
                platform: Platform::IOS,
                ..Target::default()
            },
        );

        let report = check(&ws, &Config::default(), UnityNamingStrategy::Fragment).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].configuration, "Tool|Debug|ios");
    }

    #[test]
    fn test_check_rejects_cycles() {
        let (mut ws, ids) = linked_workspace();
        ws.conf_mut(ids["Math"]).dependencies = vec![ids["App"]];
        ws.resolve_dependencies();

        let err = check(&ws, &Config::default(), UnityNamingStrategy::Fragment).unwrap_err();
        assert!(matches!(err, GenerateError::Graph(_)));
    }
}
