//! The in-memory asset store.
//!
//! [`AssetStore`] keeps two indices over asset snapshots:
//! - **by hash**: content-addressed and append-only. An entry never changes
//!   once inserted, because the same hash means the same content.
//! - **by name**: the most recently [`put`](AssetStore::put) version of each
//!   name, overwritten on every put.
//!
//! A single root [`Reference`] marks the entry point of the graph. The
//! rebuild engine ([`crate::rebuild`]), the pruner ([`crate::prune`]), and
//! directory persistence ([`crate::persist`]) all operate on this type.

use std::collections::HashMap;
use std::sync::Arc;

use assetgraph_core::{Asset, AssetError, AssetHash, Context, HashResolver, Reference};

use crate::config::EngineConfig;
use crate::registry::Registry;

/// Content-addressed asset store with a root reference.
#[derive(Debug)]
pub struct AssetStore {
    pub(crate) by_hash: HashMap<AssetHash, Asset>,
    pub(crate) by_name: HashMap<String, Asset>,
    pub(crate) root: Reference,
    pub(crate) registry: Arc<Registry>,
    pub(crate) config: EngineConfig,
}

impl AssetStore {
    /// Creates an empty store backed by `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        AssetStore {
            by_hash: HashMap::new(),
            by_name: HashMap::new(),
            root: Reference::default(),
            registry,
            config: EngineConfig::default(),
        }
    }

    /// Sets the root to the latest version of `name`, builder style.
    pub fn with_root(mut self, name: impl Into<String>) -> Self {
        self.root = Reference::by_name(name);
        self
    }

    /// Replaces the engine configuration, builder style.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The current root reference.
    pub fn root(&self) -> &Reference {
        &self.root
    }

    /// Replaces the root reference.
    ///
    /// Set only a name to track the latest version, or only a hash to pin a
    /// snapshot.
    pub fn set_root(&mut self, root: Reference) {
        self.root = root;
    }

    /// The registry consulted when injecting assets.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stores `asset` under its hash and its name, returning the hash.
    ///
    /// This is the only write path into the indices.
    pub fn put(&mut self, asset: Asset) -> Result<AssetHash, AssetError> {
        let hash = asset.hash()?;
        self.by_hash
            .entry(hash)
            .or_insert_with(|| asset.clone());
        self.by_name.insert(asset.name.clone(), asset);
        Ok(hash)
    }

    /// Returns a copy of the asset stored under `hash`.
    pub fn get_by_hash(&self, hash: &AssetHash) -> Result<Asset, AssetError> {
        self.by_hash
            .get(hash)
            .cloned()
            .ok_or_else(|| AssetError::not_found(format!("asset {hash}")))
    }

    /// Returns a copy of the latest asset stored under `name`.
    pub fn get_by_name(&self, name: &str) -> Result<Asset, AssetError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::not_found(format!("asset {name:?}")))
    }

    /// Returns a copy of the root asset, if the root has been resolved.
    pub fn root_asset(&self) -> Result<Asset, AssetError> {
        match (&self.root.hash, self.root.name.as_str()) {
            (Some(hash), _) => self.get_by_hash(hash),
            (None, "") => Err(AssetError::not_found("root")),
            (None, name) => self.get_by_name(name),
        }
    }

    /// Number of distinct asset versions held.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Names with a current version, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl HashResolver for AssetStore {
    fn resolve_hash(&self, _ctx: &Context, hash: &AssetHash) -> Result<Asset, AssetError> {
        self.get_by_hash(hash)
    }
}
