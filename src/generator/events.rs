//! Generation event types for JSON output.
//!
//! Emitted one per line with `--message-format=json`.
//!
//! # Event Types
//!
//! - `generate-started`: a run began
//! - `file-written`: a generated file was compared with the one on disk
//! - `configuration-skipped`: a platform gap skipped a configuration
//! - `diagnostic`: an error or warning
//! - `generate-finished`: the run ended
//!
//! New fields may be added; existing fields are not renamed.

use std::path::PathBuf;

use serde::Serialize;

/// One event of a generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum GenerateEvent {
    #[serde(rename = "generate-started")]
    Started {
        /// Description file
        manifest: PathBuf,
        project_count: u64,
        /// Unity naming strategy in use
        unity_naming: String,
    },

    #[serde(rename = "file-written")]
    FileWritten {
        path: PathBuf,
        /// "updated", "unchanged" or "dry-run"
        outcome: String,
    },

    #[serde(rename = "configuration-skipped")]
    ConfigurationSkipped {
        configuration: String,
        platform: String,
        /// Why the platform cannot be generated
        detail: String,
    },

    #[serde(rename = "diagnostic")]
    Diagnostic {
        /// "error" or "warning"
        level: String,
        message: String,
    },

    #[serde(rename = "generate-finished")]
    Finished {
        success: bool,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        files_updated: Option<u64>,
    },
}

impl GenerateEvent {
    pub fn started(manifest: impl Into<PathBuf>, project_count: u64, unity_naming: &str) -> Self {
        GenerateEvent::Started {
            manifest: manifest.into(),
            project_count,
            unity_naming: unity_naming.to_string(),
        }
    }

    pub fn file_written(path: impl Into<PathBuf>, outcome: &str) -> Self {
        GenerateEvent::FileWritten {
            path: path.into(),
            outcome: outcome.to_string(),
        }
    }

    pub fn skipped(
        configuration: impl Into<String>,
        platform: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        GenerateEvent::ConfigurationSkipped {
            configuration: configuration.into(),
            platform: platform.into(),
            detail: detail.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        GenerateEvent::Diagnostic {
            level: "error".to_string(),
            message: message.into(),
        }
    }

    pub fn finished(success: bool, duration_ms: u64, files_updated: Option<u64>) -> Self {
        GenerateEvent::Finished {
            success,
            duration_ms,
            files_updated,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// JSON value for [`crate::util::shell::Shell::json_event`].
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
