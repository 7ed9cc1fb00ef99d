//! The asset node type and its canonical, hashable form.
//!
//! An asset's identity is its [`AssetRecord`]: name, digest of the data,
//! frozen flag, and parent references sorted by (name, hash). The record is
//! serialized with `serde_json` in declared field order and digested with
//! blake3, so two assets with the same logical content hash identically no
//! matter how their parent lists were assembled. The same record, with
//! parents in recorded order, is what the persistence layer writes as an
//! asset's metadata file.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::AssetError;
use crate::hash::AssetHash;
use crate::reference::Reference;
use crate::traits::{NameResolver, Rebuild};

/// Serializable identity of an asset.
///
/// `data_digest` stands in for the payload so the record stays small; the
/// payload itself lives in a separate file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    pub data_digest: AssetHash,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub parents: Vec<Reference>,
}

impl AssetRecord {
    /// Returns the content hash of this record.
    pub fn hash(&self) -> Result<AssetHash, AssetError> {
        let mut canonical = self.clone();
        canonical.parents.sort();
        let bytes = serde_json::to_vec(&canonical).map_err(|source| AssetError::Serialization {
            what: format!("asset {:?}", self.name),
            source,
        })?;
        Ok(AssetHash::of(&bytes))
    }
}

/// A named, content-holding, hash-addressable node in the asset graph.
///
/// Cloning is cheap apart from the payload: the rebuild helper is shared.
/// Stores hand out clones, never references into their indices.
#[derive(Clone, Default)]
pub struct Asset {
    pub name: String,
    pub data: Vec<u8>,
    /// Exact parent versions used to produce `data`, in declaration order.
    pub parents: Vec<Reference>,
    /// Set when `data` was edited out-of-band and must not be recomputed.
    pub frozen: bool,
    rebuild: Option<Arc<dyn Rebuild>>,
}

impl Asset {
    /// Creates an empty, unfrozen asset with no rebuild helper.
    pub fn new(name: impl Into<String>) -> Self {
        Asset {
            name: name.into(),
            ..Asset::default()
        }
    }

    /// Creates an asset holding `data`.
    pub fn with_data(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Asset {
            name: name.into(),
            data: data.into(),
            ..Asset::default()
        }
    }

    /// Creates an asset whose rebuild helper re-emits `data` unchanged.
    ///
    /// Used for frozen overrides (`frozen = true`) and for defaults
    /// (`frozen = false`, so a registered rebuilder can take over later).
    pub fn constant(name: impl Into<String>, data: impl Into<Vec<u8>>, frozen: bool) -> Self {
        let name = name.into();
        let data = data.into();
        Asset {
            rebuild: Some(Arc::new(ConstantRebuilder {
                name: name.clone(),
                data: data.clone(),
                frozen,
            })),
            name,
            data,
            parents: Vec::new(),
            frozen,
        }
    }

    /// Replaces this asset's content with an out-of-band value and freezes it.
    ///
    /// Parents are cleared and the rebuild helper becomes a constant
    /// rebuilder over `data`.
    pub fn freeze(&mut self, data: Vec<u8>) {
        *self = Asset::constant(std::mem::take(&mut self.name), data, true);
    }

    /// Attaches a rebuild helper, builder style.
    pub fn with_rebuilder(mut self, rebuild: Arc<dyn Rebuild>) -> Self {
        self.rebuild = Some(rebuild);
        self
    }

    /// Replaces the rebuild helper.
    pub fn set_rebuilder(&mut self, rebuild: Option<Arc<dyn Rebuild>>) {
        self.rebuild = rebuild;
    }

    /// The attached rebuild helper, if any.
    pub fn rebuilder(&self) -> Option<&Arc<dyn Rebuild>> {
        self.rebuild.as_ref()
    }

    /// True if a rebuild helper is attached.
    pub fn has_rebuilder(&self) -> bool {
        self.rebuild.is_some()
    }

    /// The payload interpreted as UTF-8, lossily.
    pub fn data_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Returns this asset's identity record, parents in recorded order.
    pub fn record(&self) -> AssetRecord {
        AssetRecord {
            name: self.name.clone(),
            data_digest: AssetHash::of(&self.data),
            frozen: self.frozen,
            parents: self.parents.clone(),
        }
    }

    /// Computes the content hash over name, data, frozen, and sorted parents.
    pub fn hash(&self) -> Result<AssetHash, AssetError> {
        self.record().hash()
    }

    /// Resolves each of `names`, records a reference to the resolved version
    /// in `self.parents`, and returns the resolved assets keyed by name in
    /// request order.
    ///
    /// This is how rebuild helpers declare dependencies: the same call
    /// fetches the data they need and records the provenance the engine
    /// needs. The first failure aborts, wrapped with the failing name.
    pub fn get_parents(
        &mut self,
        ctx: &Context,
        resolver: &mut dyn NameResolver,
        names: &[&str],
    ) -> Result<IndexMap<String, Asset>, AssetError> {
        let mut parents = IndexMap::with_capacity(names.len());
        for &name in names {
            let parent = resolver
                .resolve(ctx, name)
                .map_err(|err| AssetError::by_name(name, err))?;
            let hash = parent
                .hash()
                .map_err(|err| AssetError::by_name(name, err))?;
            match self.parents.iter_mut().find(|existing| existing.name == name) {
                Some(existing) => existing.hash = Some(hash),
                None => self.parents.push(Reference::new(name, hash)),
            }
            parents.insert(name.to_string(), parent);
        }
        Ok(parents)
    }
}

// Equality is identity equality; the rebuild helper is not part of it.
impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.data == other.data
            && self.frozen == other.frozen
            && self.parents == other.parents
    }
}

impl Eq for Asset {}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("name", &self.name)
            .field("data", &self.data_str())
            .field("parents", &self.parents)
            .field("frozen", &self.frozen)
            .field("rebuild", &self.rebuild)
            .finish()
    }
}

/// Rebuild helper that re-emits a fixed payload.
#[derive(Debug, Clone)]
pub struct ConstantRebuilder {
    pub name: String,
    pub data: Vec<u8>,
    pub frozen: bool,
}

impl Rebuild for ConstantRebuilder {
    fn rebuild(&self, _ctx: &Context, _resolver: &mut dyn NameResolver) -> Result<Asset, AssetError> {
        Ok(Asset::constant(self.name.clone(), self.data.clone(), self.frozen))
    }

    fn describe(&self) -> String {
        if self.frozen {
            format!("constant({:?}, frozen)", self.name)
        } else {
            format!("constant({:?})", self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    /// Resolver over a fixed map of assets.
    struct MapResolver(HashMap<String, Asset>);

    impl NameResolver for MapResolver {
        fn resolve(&mut self, _ctx: &Context, name: &str) -> Result<Asset, AssetError> {
            self.0
                .get(name)
                .cloned()
                .ok_or_else(|| AssetError::not_found(format!("{name:?}")))
        }
    }

    fn asset_with_parents(parents: &[(&str, &str)]) -> Asset {
        let mut asset = Asset::with_data("child", "payload");
        for (name, content) in parents {
            asset.parents.push(Reference::new(*name, AssetHash::of(content.as_bytes())));
        }
        asset
    }

    #[test]
    fn test_hash_ignores_parent_order() {
        let a = asset_with_parents(&[("x", "1"), ("y", "2"), ("z", "3")]);
        let b = asset_with_parents(&[("z", "3"), ("x", "1"), ("y", "2")]);
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        // Display order is preserved.
        assert_eq!(b.parents[0].name, "z");
    }

    #[test]
    fn test_hash_covers_every_identity_field() {
        let base = asset_with_parents(&[("x", "1")]);
        let base_hash = base.hash().unwrap();

        let mut renamed = base.clone();
        renamed.name = "other".into();
        assert_ne!(renamed.hash().unwrap(), base_hash, "name must affect hash");

        let mut edited = base.clone();
        edited.data = b"different".to_vec();
        assert_ne!(edited.hash().unwrap(), base_hash, "data must affect hash");

        let mut frozen = base.clone();
        frozen.frozen = true;
        assert_ne!(frozen.hash().unwrap(), base_hash, "frozen must affect hash");

        let reparented = asset_with_parents(&[("x", "changed")]);
        assert_ne!(reparented.hash().unwrap(), base_hash, "parent version must affect hash");
    }

    #[test]
    fn test_hash_ignores_rebuilder() {
        let plain = Asset::with_data("a", "v");
        let constant = Asset::constant("a", "v", false);
        assert!(constant.has_rebuilder());
        assert_eq!(plain.hash().unwrap(), constant.hash().unwrap());
        assert_eq!(plain, constant);
    }

    #[test]
    fn test_get_parents_records_references() {
        let a = Asset::with_data("a/a", "a-data");
        let b = Asset::with_data("b", "b-data");
        let mut resolver = MapResolver(HashMap::from([
            ("a/a".to_string(), a.clone()),
            ("b".to_string(), b.clone()),
        ]));

        let mut child = Asset::new("c");
        let parents = child
            .get_parents(&Context::background(), &mut resolver, &["b", "a/a"])
            .unwrap();

        assert_eq!(parents.keys().collect::<Vec<_>>(), vec!["b", "a/a"]);
        assert_eq!(parents["a/a"].data, b"a-data");
        assert_eq!(
            child.parents,
            vec![
                Reference::new("b", b.hash().unwrap()),
                Reference::new("a/a", a.hash().unwrap()),
            ]
        );
    }

    #[test]
    fn test_get_parents_records_repeated_name_once() {
        let a = Asset::with_data("a", "a-data");
        let mut resolver = MapResolver(HashMap::from([("a".to_string(), a.clone())]));

        let mut once = Asset::new("c");
        once.get_parents(&Context::background(), &mut resolver, &["a"])
            .unwrap();
        let mut twice = Asset::new("c");
        let parents = twice
            .get_parents(&Context::background(), &mut resolver, &["a", "a"])
            .unwrap();

        assert_eq!(parents.len(), 1);
        assert_eq!(twice.parents, vec![Reference::new("a", a.hash().unwrap())]);
        assert_eq!(twice.hash().unwrap(), once.hash().unwrap());
    }

    #[test]
    fn test_get_parents_names_failing_parent() {
        let mut resolver = MapResolver(HashMap::new());
        let mut child = Asset::new("c");
        let err = child
            .get_parents(&Context::background(), &mut resolver, &["missing"])
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.name_chain(), vec!["missing"]);
        assert!(child.parents.is_empty());
    }

    #[test]
    fn test_freeze_clears_parents() {
        let mut asset = asset_with_parents(&[("x", "1")]);
        asset.freeze(b"edited".to_vec());
        assert!(asset.frozen);
        assert!(asset.parents.is_empty());
        assert_eq!(asset.name, "child");
        assert_eq!(asset.data, b"edited");

        let rebuilt = asset
            .rebuilder()
            .unwrap()
            .rebuild(&Context::background(), &mut MapResolver(HashMap::new()))
            .unwrap();
        assert_eq!(rebuilt, asset);
    }

    proptest! {
        #[test]
        fn prop_hash_independent_of_parent_insertion_order(
            names in proptest::collection::btree_set("[a-z]{1,6}", 0..8),
            data in proptest::collection::vec(any::<u8>(), 0..64),
            frozen in any::<bool>(),
        ) {
            let refs: Vec<Reference> = names
                .iter()
                .map(|n| Reference::new(n.clone(), AssetHash::of(n.as_bytes())))
                .collect();
            let mut forward = Asset::with_data("node", data.clone());
            forward.frozen = frozen;
            forward.parents = refs.clone();
            let mut backward = forward.clone();
            backward.parents.reverse();
            prop_assert_eq!(forward.hash().unwrap(), backward.hash().unwrap());
        }
    }
}
