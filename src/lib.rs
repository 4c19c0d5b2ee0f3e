//! fastbff - FASTBuild file generation for multi-platform C/C++ solutions
//!
//! This crate loads a description of projects, configurations and
//! solutions and writes the `.bff` files FASTBuild reads: one file per
//! project plus a master file per solution.

pub mod core;
pub mod generator;
pub mod ops;
pub mod util;

/// Test utilities for fastbff unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides in-memory workspaces and on-disk
/// description files.
#[cfg(test)]
pub mod test_support;

pub use core::{Configuration, Project, Solution, Workspace};
pub use generator::{GenerateError, UnityNamingStrategy};
pub use util::config::Config;
