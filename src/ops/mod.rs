//! High-level operations.
//!
//! This module contains the implementation of fastbff commands.

pub mod check;
pub mod generate;
pub mod targets;

pub use check::{check, CheckReport};
pub use generate::{
    generate, plan_generation, FileOutcome, GenerateOptions, GenerateResult, GenerationPlan,
    OutputsManifest,
};
pub use targets::{fbuild_command, fbuild_executable, list_targets, TargetLine};
