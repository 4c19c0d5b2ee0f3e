//! Global context for fastbff operations.
//!
//! Holds the working directory and the fastbff home, locates description
//! files, and loads the merged configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::manifest::MANIFEST_NAME;
use crate::util::config::{global_config_dir, load_config, project_config_path, Config};
use crate::util::diagnostic::suggestions;

/// Global context containing configuration paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global fastbff data (~/.fastbff/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let home = global_config_dir().unwrap_or_else(|| PathBuf::from(".fastbff"));
        Ok(GlobalContext { cwd, home })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Resolve the description file: `explicit` if given, otherwise the
    /// nearest `FastBff.toml` from the working directory upward.
    pub fn find_manifest(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.cwd.join(path)
            };
            if !path.is_file() {
                bail!(
                    "description file not found: {}\n{}",
                    path.display(),
                    suggestions::NO_MANIFEST
                );
            }
            return Ok(path);
        }

        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                bail!(
                    "could not find `{}` in `{}` or any parent directory\n{}",
                    MANIFEST_NAME,
                    self.cwd.display(),
                    suggestions::NO_MANIFEST
                );
            }
        }
    }

    /// Global config merged with the project config next to `manifest`.
    pub fn load_config(&self, manifest: &Path) -> Config {
        let root = manifest.parent().unwrap_or(&self.cwd);
        load_config(&self.config_path(), &project_config_path(root))
    }
}
