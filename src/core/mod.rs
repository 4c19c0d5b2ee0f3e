//! Core data structures for fastbff.
//!
//! This module contains the input model the generator reads:
//! - Target fragments and the fragment-axis registry
//! - Projects, configurations and solutions in a [`Workspace`] arena
//! - Platform capability adapters
//! - Loading a workspace from a description file

pub mod configuration;
pub mod manifest;
pub mod platform;
pub mod project;
pub mod solution;
pub mod target;

pub use configuration::{Configuration, OutputType};
pub use manifest::{load_workspace, MANIFEST_NAME};
pub use platform::{platform_bff, PlatformBff};
pub use project::Project;
pub use solution::{ConfId, ProjectId, Solution, Workspace};
pub use target::{DevEnv, Platform, Target};
