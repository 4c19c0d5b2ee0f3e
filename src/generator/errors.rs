//! Generation error types and diagnostics.
//!
//! Configuration, graph and naming errors abort the whole run. A
//! [`ToolingGap`] only skips the configuration it was raised for.

use thiserror::Error;

use crate::util::diagnostic::{suggestions, CyclicDependencyReport, Diagnostic};

/// Invalid or contradictory settings in the description.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("`{configuration}` enables both FASTBuild blobbing and legacy blobbing")]
    ConflictingBlobbing { configuration: String },

    #[error("`{file}` in `{configuration}` is compiled as C and cannot consume WinRT extensions")]
    CFileConsumesWinRt { configuration: String, file: String },

    #[error("`{file}` in `{configuration}` has conflicting overrides: {detail}")]
    ConflictingOverrides {
        configuration: String,
        file: String,
        detail: String,
    },

    #[error("build step `{step}` of `{configuration}` has kind `{kind}`, which is not supported")]
    UnsupportedBuildStep {
        configuration: String,
        step: String,
        kind: String,
    },

    #[error("pre-link steps are not supported (`{configuration}`)")]
    PreLinkNotSupported { configuration: String },

    #[error("duplicate build step key `{key}` in `{configuration}`")]
    DuplicateBuildStep { configuration: String, key: String },

    #[error("`{configuration}` links `{dependency}`, which is not among its resolved dependencies")]
    UnresolvedDependency {
        configuration: String,
        dependency: String,
    },

    #[error("unknown dependency `{reference}` in `{configuration}`")]
    UnknownDependency {
        configuration: String,
        reference: String,
    },

    #[error("solution `{solution}` lists unknown project `{project}`")]
    UnknownProject { solution: String, project: String },

    #[error("unknown {axis} `{value}` in `{project}|{configuration}`")]
    UnknownFragment {
        project: String,
        configuration: String,
        axis: &'static str,
        value: String,
    },

    #[error("project `{project}` is declared twice")]
    DuplicateProject { project: String },

    #[error("configuration `{configuration}` is declared twice for one platform in `{project}`")]
    DuplicateConfiguration {
        project: String,
        configuration: String,
    },

    #[error("`{entity}` is missing required field `{field}`")]
    MissingField { entity: String, field: &'static str },

    #[error("no FASTBuild project is included in master file `{master}`")]
    NoFastBuildProject { master: String },
}

/// Errors in the dependency or include graphs.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("cyclic {kind} dependency detected involving `{configuration}`")]
    CyclicDependency {
        configuration: String,
        kind: &'static str,
        path: Vec<String>,
    },

    #[error("`{configuration}` depends on itself")]
    SelfDependency { configuration: String },

    #[error("`{file}` includes itself")]
    SelfInclude { file: String },

    #[error("circular include detected at `{file}`")]
    CircularInclude { file: String },
}

/// Errors resolving unity names and patterns.
#[derive(Debug, Error)]
pub enum NamingError {
    #[error("unity `{unity}` has output pattern `{pattern}` without a `*` wildcard")]
    MissingWildcard { unity: String, pattern: String },

    #[error("unity `{unity}` has output pattern `{pattern}` with more than one `*` wildcard")]
    MultipleWildcards { unity: String, pattern: String },

    #[error("two different unities of `{project}` resolve to the name `{name}`")]
    NameCollision { project: String, name: String },
}

/// A platform lacks a capability generation needs. The configuration is skipped.
#[derive(Debug, Clone, Error)]
#[error("skipping `{configuration}`: {reason}")]
pub struct ToolingGap {
    pub configuration: String,
    pub platform: String,
    pub reason: String,
}

/// Any error raised while generating.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error(transparent)]
    Tooling(#[from] ToolingGap),
}

impl GenerateError {
    /// Tooling gaps skip a configuration; everything else aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GenerateError::Tooling(_))
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GenerateError::Configuration(e) => e.to_diagnostic(),
            GenerateError::Graph(e) => e.to_diagnostic(),
            GenerateError::Naming(e) => e.to_diagnostic(),
            GenerateError::Tooling(gap) => Diagnostic::warning(gap.to_string())
                .with_context(format!("platform `{}`", gap.platform)),
        }
    }
}

impl ConfigurationError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            ConfigurationError::ConflictingBlobbing { .. } => {
                diag.with_suggestion(suggestions::SINGLE_BLOBBER)
            }
            ConfigurationError::CFileConsumesWinRt { file, .. } => diag
                .with_suggestion(format!("Add `{}` to `exclude_winrt`", file))
                .with_suggestion("Compile the file as C++ instead"),
            ConfigurationError::ConflictingOverrides { file, .. } => diag.with_suggestion(
                format!("List `{}` in at most one of the conflicting override lists", file),
            ),
            ConfigurationError::UnsupportedBuildStep { .. } => {
                diag.with_context("supported kinds: exec, test, copy")
            }
            ConfigurationError::PreLinkNotSupported { .. } => {
                diag.with_suggestion("Move the step to `pre_build` or `post_build`")
            }
            ConfigurationError::DuplicateBuildStep { key, .. } => {
                diag.with_suggestion(format!("Rename one of the steps keyed `{}`", key))
            }
            ConfigurationError::UnresolvedDependency { .. }
            | ConfigurationError::UnknownDependency { .. }
            | ConfigurationError::UnknownProject { .. } => {
                diag.with_suggestion(suggestions::UNKNOWN_DEPENDENCY)
            }
            ConfigurationError::UnknownFragment { axis, .. } => {
                diag.with_context(format!("check the `{}` field", axis))
            }
            ConfigurationError::DuplicateProject { .. }
            | ConfigurationError::DuplicateConfiguration { .. } => {
                diag.with_context("generated node names must be unique")
            }
            ConfigurationError::MissingField { field, .. } => {
                diag.with_suggestion(format!("Set `{}` in the description", field))
            }
            ConfigurationError::NoFastBuildProject { .. } => {
                diag.with_suggestion("Enable `fastbuild` on at least one configuration")
            }
        }
    }
}

impl GraphError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            GraphError::CyclicDependency { path, .. } => diag
                .with_context(format!("cycle: {}", path.join(" -> ")))
                .with_suggestion(suggestions::BREAK_CYCLE),
            GraphError::SelfDependency { .. } => {
                diag.with_suggestion("Remove the dependency on the configuration itself")
            }
            GraphError::SelfInclude { .. } | GraphError::CircularInclude { .. } => {
                diag.with_suggestion(suggestions::BREAK_CYCLE)
            }
        }
    }

    /// Rich miette report for cycles, `None` for other graph errors.
    pub fn cycle_report(&self) -> Option<CyclicDependencyReport> {
        match self {
            GraphError::CyclicDependency {
                configuration,
                path,
                ..
            } => Some(CyclicDependencyReport::from_path(configuration, path)),
            _ => None,
        }
    }
}

impl NamingError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            NamingError::MissingWildcard { .. } | NamingError::MultipleWildcards { .. } => {
                diag.with_suggestion(suggestions::UNITY_PATTERN)
            }
            NamingError::NameCollision { .. } => diag
                .with_suggestion("Use `--unity-naming hash` or `fragment-hash`")
                .with_suggestion("Set distinct `unity_section_bucket` values"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_diagnostic() {
        let err = GraphError::CyclicDependency {
            configuration: "X|Debug|win64".to_string(),
            kind: "direct",
            path: vec![
                "X|Debug|win64".to_string(),
                "Y|Debug|win64".to_string(),
                "X|Debug|win64".to_string(),
            ],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("cyclic direct dependency"));
        assert!(output.contains("X|Debug|win64 -> Y|Debug|win64 -> X|Debug|win64"));

        let report = err.cycle_report().unwrap();
        assert_eq!(report.chain.len(), 2);
    }

    #[test]
    fn test_tooling_gap_is_not_fatal() {
        let gap: GenerateError = ToolingGap {
            configuration: "App|Debug|ios".to_string(),
            platform: "ios".to_string(),
            reason: "no FASTBuild support".to_string(),
        }
        .into();
        assert!(!gap.is_fatal());
        assert!(gap.to_diagnostic().format(false).starts_with("warning:"));

        let fatal: GenerateError = ConfigurationError::ConflictingBlobbing {
            configuration: "Core|Debug|win64".to_string(),
        }
        .into();
        assert!(fatal.is_fatal());
    }

    #[test]
    fn test_c_winrt_diagnostic_suggests_exclusion() {
        let err = ConfigurationError::CFileConsumesWinRt {
            configuration: "Core|Debug|win64".to_string(),
            file: "src/b.c".to_string(),
        };
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("cannot consume WinRT"));
        assert!(output.contains("exclude_winrt"));
    }
}
