//! Store, rebuild engine, and directory persistence for the asset graph.
//!
//! Provides the [`AssetStore`] that holds asset snapshots by hash and by
//! name, the rebuild engine that recomputes a root's dependency closure, and
//! the directory layer that persists the graph and detects hand edits.
//!
//! # Architecture
//!
//! A typical run:
//! - build a [`Registry`] of rebuild helpers and defaults at startup
//! - create an [`AssetStore`] with a root name
//! - [`AssetStore::read`] the asset directory (load, default, rebuild)
//! - [`AssetStore::prune`] and [`AssetStore::write`] the result back
//!
//! # Modules
//!
//! - [`store`]: AssetStore indices and root reference
//! - [`registry`]: Registry and RegistryBuilder
//! - [`rebuild`]: rebuild engine and the Injector seam
//! - [`report`]: RebuildReport of created/changed/fresh assets
//! - [`prune`]: in-memory mark-and-sweep and on-disk pruning
//! - [`persist`]: per-asset file I/O and DirectoryInjector
//! - [`inspect`]: listing, drift status, and dependency graphs from disk
//! - [`config`]: EngineConfig and PrunePolicy

pub mod config;
pub mod inspect;
pub mod persist;
pub mod prune;
pub mod rebuild;
pub mod registry;
pub mod report;
pub mod store;

// Re-export key types for ergonomic use.
pub use config::{ConfigError, EngineConfig, PrunePolicy};
pub use inspect::{dependency_graph, dependency_order, list_assets, to_dot, AssetSummary, DiskStatus};
pub use persist::{read_asset, write_asset, DirectoryInjector};
pub use prune::{prune_directory, PruneSummary};
pub use rebuild::Injector;
pub use registry::{Registry, RegistryBuilder};
pub use report::RebuildReport;
pub use store::AssetStore;
