//! FASTBuild file generation.
//!
//! Per project: [`subconfig`] partitions each configuration's files,
//! [`unity`] and [`naming`] group and name the unity sections, [`nodes`]
//! emits the build graph nodes and [`project_bff`] assembles the file.
//! [`master`] then writes the aggregate files of every solution, with
//! [`deps`] providing dependency order.

pub mod cache;
pub mod deps;
pub mod errors;
pub mod events;
pub mod master;
pub mod naming;
pub mod nodes;
pub mod project_bff;
pub mod subconfig;
pub mod template;
pub mod templates;
pub mod unity;

pub use cache::GenerationCache;
pub use deps::{DependencyKind, DependencyOrderer};
pub use errors::GenerateError;
pub use master::GeneratedFile;
pub use naming::UnityNamingStrategy;
