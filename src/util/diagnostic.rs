//! User-friendly diagnostic messages.
//!
//! Every fatal generation error names the offending project or configuration
//! and, where one exists, a concrete fix.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no description file is found.
    pub const NO_MANIFEST: &str =
        "help: Create a FastBff.toml or pass `--manifest <path>` to point at one";

    /// Suggestion when a dependency graph contains a cycle.
    pub const BREAK_CYCLE: &str =
        "help: Turn one of the edges into a build-only dependency, or remove it";

    /// Suggestion when a dependency reference does not resolve.
    pub const UNKNOWN_DEPENDENCY: &str =
        "help: Run `fastbff targets` to see the available configurations";

    /// Suggestion when a unity output pattern is malformed.
    pub const UNITY_PATTERN: &str =
        "help: Unity output patterns need exactly one `*` where the shard index goes";

    /// Suggestion when both blobbing mechanisms are enabled.
    pub const SINGLE_BLOBBER: &str =
        "help: Set either `fastbuild_blobbed` or `legacy_blobbed`, not both";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Rich report for a dependency cycle, rendered through miette's fancy handler.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("cyclic dependency detected involving `{configuration}`")]
#[diagnostic(
    code(fastbff::graph::cycle),
    help("Turn one of the edges into a build-only dependency, or remove it")
)]
pub struct CyclicDependencyReport {
    pub configuration: String,
    #[related]
    pub chain: Vec<CycleEdge>,
}

/// One edge of a reported cycle.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("`{from}` depends on `{to}`")]
#[diagnostic(severity(Advice))]
pub struct CycleEdge {
    pub from: String,
    pub to: String,
}

impl CyclicDependencyReport {
    /// Build a report from the chain of configuration names forming the cycle.
    ///
    /// `path` is expected to start and end on the same configuration.
    pub fn from_path(configuration: &str, path: &[String]) -> Self {
        let chain = path
            .windows(2)
            .map(|pair| CycleEdge {
                from: pair[0].clone(),
                to: pair[1].clone(),
            })
            .collect();
        CyclicDependencyReport {
            configuration: configuration.to_string(),
            chain,
        }
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("cyclic dependency detected involving `X|Debug|win64`")
            .with_context("X|Debug|win64 -> Y|Debug|win64 -> X|Debug|win64")
            .with_suggestion("Turn one of the edges into a build-only dependency");

        let output = diag.format(false);
        assert!(output.contains("error: cyclic dependency"));
        assert!(output.contains("X|Debug|win64 -> Y|Debug|win64"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Turn one of the edges"));
    }

    #[test]
    fn test_warning_severity() {
        let diag = Diagnostic::warning("skipping `App|Debug|ios`");
        assert_eq!(diag.severity, Severity::Warning);
        assert!(diag.format(false).starts_with("warning: "));
    }

    #[test]
    fn test_cycle_report_chain() {
        let path = vec!["X".to_string(), "Y".to_string(), "X".to_string()];
        let report = CyclicDependencyReport::from_path("X", &path);
        assert_eq!(report.chain.len(), 2);
        assert_eq!(report.chain[1].to_string(), "`Y` depends on `X`");
    }
}
