//! Configuration file support for fastbff.
//!
//! fastbff supports two configuration file locations:
//! - Global: `~/.fastbff/config.toml` - User-wide defaults
//! - Project: `.fastbff/config.toml` - Overrides next to the description file
//!
//! Project config takes precedence over global config, and command line
//! flags take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::generator::naming::UnityNamingStrategy;

/// Windows SDK version used when neither the config nor the environment names one.
pub const DEFAULT_WINDOWS_SDK_VERSION: &str = "10.0.19041.0";

/// fastbff configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation settings
    pub generate: GenerateConfig,

    /// Settings written into the global settings file and used for command lines
    pub fastbuild: FastBuildConfig,

    /// Platform SDK settings
    pub sdk: SdkConfig,
}

/// Generation-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Unity naming strategy (hash, fragment, fragment-hash)
    pub unity_naming: Option<String>,

    /// Emit an `All-Configs` alias in master files
    #[serde(default)]
    pub all_configs_section: bool,

    /// Write the list of generated outputs to this JSON file
    pub emit_outputs: Option<PathBuf>,
}

/// FASTBuild-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FastBuildConfig {
    /// Path to the fbuild executable (looked up on PATH when unset)
    pub executable: Option<PathBuf>,

    /// Shared object cache location
    pub cache_path: Option<String>,

    /// Cache plugin DLL
    pub cache_plugin_dll: Option<String>,

    /// Maximum number of remote workers
    pub worker_connection_limit: Option<u32>,

    /// Let FASTBuild migrate its database between versions
    #[serde(default)]
    pub allow_db_migration: bool,

    /// Windows system root written into the environment block
    pub system_root: Option<String>,

    /// Extra arguments appended to every generated fbuild command line
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// SDK-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Windows SDK version per development environment (e.g. `vs2019 = "10.0.19041.0"`)
    #[serde(default)]
    pub windows_sdk_versions: BTreeMap<String, String>,

    /// Root of the Windows SDK installation
    pub windows_sdk_dir: Option<String>,

    /// Visual Studio installation roots per development environment
    #[serde(default)]
    pub visual_studio_dirs: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Generate settings
        if other.generate.unity_naming.is_some() {
            self.generate.unity_naming = other.generate.unity_naming;
        }
        if other.generate.all_configs_section {
            self.generate.all_configs_section = true;
        }
        if other.generate.emit_outputs.is_some() {
            self.generate.emit_outputs = other.generate.emit_outputs;
        }

        // FASTBuild settings
        if other.fastbuild.executable.is_some() {
            self.fastbuild.executable = other.fastbuild.executable;
        }
        if other.fastbuild.cache_path.is_some() {
            self.fastbuild.cache_path = other.fastbuild.cache_path;
        }
        if other.fastbuild.cache_plugin_dll.is_some() {
            self.fastbuild.cache_plugin_dll = other.fastbuild.cache_plugin_dll;
        }
        if other.fastbuild.worker_connection_limit.is_some() {
            self.fastbuild.worker_connection_limit = other.fastbuild.worker_connection_limit;
        }
        if other.fastbuild.allow_db_migration {
            self.fastbuild.allow_db_migration = true;
        }
        if other.fastbuild.system_root.is_some() {
            self.fastbuild.system_root = other.fastbuild.system_root;
        }
        if !other.fastbuild.extra_args.is_empty() {
            self.fastbuild.extra_args = other.fastbuild.extra_args;
        }

        // SDK settings: per-key override
        self.sdk
            .windows_sdk_versions
            .extend(other.sdk.windows_sdk_versions);
        self.sdk
            .visual_studio_dirs
            .extend(other.sdk.visual_studio_dirs);
        if other.sdk.windows_sdk_dir.is_some() {
            self.sdk.windows_sdk_dir = other.sdk.windows_sdk_dir;
        }
    }

    /// Parse the unity naming strategy from config string.
    pub fn unity_naming(&self) -> Option<UnityNamingStrategy> {
        self.generate
            .unity_naming
            .as_ref()
            .and_then(|s| match s.parse() {
                Ok(strategy) => Some(strategy),
                Err(e) => {
                    tracing::warn!("ignoring unity_naming from config: {}", e);
                    None
                }
            })
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.fastbff/config.toml)
/// 2. Global config (~/.fastbff/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global fastbff config directory (~/.fastbff).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".fastbff"))
}

/// Get the project config path (.fastbff/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".fastbff").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.generate.unity_naming.is_none());
        assert!(!config.generate.all_configs_section);
        assert!(config.fastbuild.executable.is_none());
        assert!(config.sdk.windows_sdk_versions.is_empty());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[generate]
unity_naming = "hash"
all_configs_section = true

[fastbuild]
cache_path = "//server/cache"
worker_connection_limit = 12

[sdk.windows_sdk_versions]
vs2019 = "10.0.18362.0"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.generate.unity_naming, Some("hash".to_string()));
        assert!(config.generate.all_configs_section);
        assert_eq!(config.fastbuild.cache_path, Some("//server/cache".to_string()));
        assert_eq!(config.fastbuild.worker_connection_limit, Some(12));
        assert_eq!(
            config.sdk.windows_sdk_versions.get("vs2019").map(String::as_str),
            Some("10.0.18362.0")
        );
        assert_eq!(config.unity_naming(), Some(UnityNamingStrategy::Hash));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.generate.unity_naming = Some("fragment".to_string());
        base.fastbuild.worker_connection_limit = Some(4);
        base.sdk
            .windows_sdk_versions
            .insert("vs2017".to_string(), "10.0.17763.0".to_string());

        let mut override_cfg = Config::default();
        override_cfg.generate.unity_naming = Some("fragment-hash".to_string());
        override_cfg
            .sdk
            .windows_sdk_versions
            .insert("vs2019".to_string(), "10.0.19041.0".to_string());

        base.merge(override_cfg);

        assert_eq!(base.unity_naming(), Some(UnityNamingStrategy::FragmentHash));
        assert_eq!(base.fastbuild.worker_connection_limit, Some(4)); // Not overridden
        assert_eq!(base.sdk.windows_sdk_versions.len(), 2);
    }

    #[test]
    fn test_invalid_naming_is_ignored() {
        let mut config = Config::default();
        config.generate.unity_naming = Some("random".to_string());
        assert_eq!(config.unity_naming(), None);
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[fastbuild]
cache_path = "C:/cache"
extra_args = ["-dist"]
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[fastbuild]
extra_args = ["-cache", "-summary"]
"#,
        )
        .unwrap();

        let config = load_config(&global_path, &project_path);

        assert_eq!(config.fastbuild.cache_path, Some("C:/cache".to_string()));
        assert_eq!(config.fastbuild.extra_args, vec!["-cache", "-summary"]);
    }
}
