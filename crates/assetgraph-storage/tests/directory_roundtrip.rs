//! End-to-end tests for reading, rebuilding, pruning, and writing an asset
//! directory.
//!
//! Each test registers a small producer set, drives the store through
//! `read` and `write` against a temporary directory, and edits files between
//! runs the way a user would.
//!
//! Tests cover:
//! - Change propagation through a three-asset chain
//! - Freezing hand-edited assets and decoupling them from ancestors
//! - Rebuild stability across runs
//! - Prune followed by write leaving exactly the reachable paths
//! - Missing-dependency diagnosis
//! - Slug collisions and prune policies

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetgraph_core::{Asset, AssetError, Context, NameResolver, Rebuild, Reference};
use assetgraph_storage::{list_assets, AssetStore, DiskStatus, EngineConfig, PrunePolicy, Registry};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Rebuilds `name` by appending `suffix` to the data of `parent`.
struct Append {
    name: &'static str,
    parent: &'static str,
    suffix: &'static str,
}

impl Rebuild for Append {
    fn rebuild(&self, ctx: &Context, resolver: &mut dyn NameResolver) -> Result<Asset, AssetError> {
        let mut asset = Asset::new(self.name);
        let parents = asset.get_parents(ctx, resolver, &[self.parent])?;
        let mut data = parents[self.parent].data.clone();
        data.extend_from_slice(self.suffix.as_bytes());
        asset.data = data;
        Ok(asset)
    }
}

/// The three-asset chain: "a/a" (default) <- "b" <- "c".
fn chain_registry() -> Arc<Registry> {
    let registry = Registry::builder()
        .default_value("a/a", "a-data")
        .rebuilder(
            "b",
            Append {
                name: "b",
                parent: "a/a",
                suffix: ", modified by b",
            },
        )
        .rebuilder(
            "c",
            Append {
                name: "c",
                parent: "b",
                suffix: ", modified by c",
            },
        )
        .build()
        .expect("registry should build");
    Arc::new(registry)
}

/// Reads `dir` into a fresh store rooted at "c".
fn read(dir: &Path, registry: &Arc<Registry>) -> AssetStore {
    let mut store = AssetStore::new(registry.clone()).with_root("c");
    store
        .read(&Context::background(), dir, Some(registry.as_ref()))
        .expect("read should succeed");
    store
}

fn write(store: &AssetStore, dir: &Path, prune: bool) -> BTreeSet<PathBuf> {
    store
        .write(&Context::background(), dir, prune)
        .expect("write should succeed")
}

/// Every relative path under `dir`, files and directories.
fn tree(dir: &Path) -> BTreeSet<PathBuf> {
    walk(dir, dir)
}

fn walk(root: &Path, dir: &Path) -> BTreeSet<PathBuf> {
    let mut paths = BTreeSet::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        paths.insert(path.strip_prefix(root).unwrap().to_path_buf());
        if path.is_dir() {
            paths.extend(walk(root, &path));
        }
    }
    paths
}

// ---------------------------------------------------------------------------
// Change propagation and freezing
// ---------------------------------------------------------------------------

#[test]
fn test_chain_reads_defaults_then_propagates_edits() {
    let dir = tempfile::tempdir().unwrap();
    let registry = chain_registry();

    // First run: empty directory, everything from defaults and rebuilders.
    let store = read(dir.path(), &registry);
    let c = store.root_asset().unwrap();
    assert_eq!(c.data_str(), "a-data, modified by b, modified by c");
    let first_root = store.root().hash.expect("root should be pinned after read");
    write(&store, dir.path(), false);
    assert_eq!(
        fs::read_to_string(dir.path().join("b")).unwrap(),
        "a-data, modified by b"
    );

    // Edit the leaf on disk: the change threads through every layer.
    fs::write(dir.path().join("a/a"), "edited a").unwrap();
    let store = read(dir.path(), &registry);
    assert_eq!(
        store.get_by_name("b").unwrap().data_str(),
        "edited a, modified by b"
    );
    assert_eq!(
        store.root_asset().unwrap().data_str(),
        "edited a, modified by b, modified by c"
    );
    let second_root = store.root().hash.unwrap();
    assert_ne!(first_root, second_root, "root hash should change");
    write(&store, dir.path(), false);

    // Edit the middle asset: it freezes and drops its parents.
    fs::write(dir.path().join("b"), "edited b").unwrap();
    let store = read(dir.path(), &registry);
    assert_eq!(
        store.root_asset().unwrap().data_str(),
        "edited b, modified by c"
    );
    let b = store.get_by_name("b").unwrap();
    assert!(b.frozen, "hand-edited asset should be frozen");
    assert!(b.parents.is_empty(), "frozen asset should have no parents");
}

#[test]
fn test_frozen_asset_ignores_ancestor_edits() {
    let dir = tempfile::tempdir().unwrap();
    let registry = chain_registry();

    let store = read(dir.path(), &registry);
    write(&store, dir.path(), false);

    fs::write(dir.path().join("b"), "pinned b").unwrap();
    let store = read(dir.path(), &registry);
    write(&store, dir.path(), false);

    fs::write(dir.path().join("a/a"), "edited a").unwrap();
    let store = read(dir.path(), &registry);
    assert_eq!(store.get_by_name("b").unwrap().data_str(), "pinned b");
    assert_eq!(
        store.root_asset().unwrap().data_str(),
        "pinned b, modified by c"
    );
    assert!(store.get_by_name("b").unwrap().frozen);
}

#[test]
fn test_frozen_state_survives_write() {
    let dir = tempfile::tempdir().unwrap();
    let registry = chain_registry();

    let store = read(dir.path(), &registry);
    write(&store, dir.path(), false);
    fs::write(dir.path().join("b"), "pinned b").unwrap();
    let store = read(dir.path(), &registry);
    write(&store, dir.path(), false);

    let listed = list_assets(dir.path()).unwrap();
    let b = listed.iter().find(|s| s.name == "b").unwrap();
    assert!(b.frozen, "frozen flag should be recorded in metadata");
    assert_eq!(b.status, DiskStatus::Clean);
}

#[test]
fn test_unchanged_directory_reads_stable() {
    let dir = tempfile::tempdir().unwrap();
    let registry = chain_registry();

    let store = read(dir.path(), &registry);
    let first = store.root().hash.unwrap();
    write(&store, dir.path(), false);

    let mut store = AssetStore::new(registry.clone()).with_root("c");
    let report = store
        .read(&Context::background(), dir.path(), Some(registry.as_ref()))
        .unwrap();
    assert_eq!(store.root().hash, Some(first));
    assert!(report.is_clean(), "nothing should change: {report:?}");
    assert_eq!(report.total(), 3);

    // A second pass over the same store is also stable.
    let report = store.rebuild(&Context::background(), None).unwrap();
    assert!(report.is_clean());
    assert_eq!(store.root().hash, Some(first));
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

#[test]
fn test_prune_then_write_leaves_reachable_paths() {
    let dir = tempfile::tempdir().unwrap();
    let registry = chain_registry();

    let mut store = read(dir.path(), &registry);
    store.put(Asset::with_data("stale/orphan", "old")).unwrap();
    fs::create_dir_all(dir.path().join("leftover/nested")).unwrap();
    fs::write(dir.path().join("leftover/nested/file"), "x").unwrap();
    fs::write(dir.path().join("stray"), "x").unwrap();

    let summary = store.prune();
    assert!(summary.removed_names.contains("stale/orphan"));
    assert!(store.get_by_name("stale/orphan").unwrap_err().is_not_found());
    for name in ["a/a", "b", "c"] {
        assert!(store.get_by_name(name).is_ok(), "{name} should survive prune");
    }

    let written = write(&store, dir.path(), true);
    let expected: BTreeSet<PathBuf> = [
        ".state",
        ".state/a",
        ".state/a/a",
        ".state/b",
        ".state/c",
        "a",
        "a/a",
        "b",
        "c",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect();
    assert_eq!(written, expected);
    assert_eq!(tree(dir.path()), expected);
}

#[test]
fn test_prune_policy_from_config_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let registry = chain_registry();
    let config = EngineConfig {
        prune_policy: PrunePolicy::FailFast,
        rebuild_timeout: None,
    };

    let mut store = AssetStore::new(registry.clone())
        .with_root("c")
        .with_config(config);
    store
        .read(&Context::background(), dir.path(), Some(registry.as_ref()))
        .unwrap();
    fs::write(dir.path().join("stray"), "x").unwrap();

    // Nothing fails to delete here, so fail-fast behaves like best-effort.
    write(&store, dir.path(), true);
    assert!(!dir.path().join("stray").exists());
}

// ---------------------------------------------------------------------------
// Diagnosis
// ---------------------------------------------------------------------------

#[test]
fn test_missing_dependency_names_chain() {
    let dir = tempfile::tempdir().unwrap();
    // No default for "a/a".
    let registry = Registry::builder()
        .rebuilder(
            "b",
            Append {
                name: "b",
                parent: "a/a",
                suffix: "!",
            },
        )
        .rebuilder(
            "c",
            Append {
                name: "c",
                parent: "b",
                suffix: "!",
            },
        )
        .build()
        .unwrap();
    let registry = Arc::new(registry);

    let mut store = AssetStore::new(registry.clone()).with_root("c");
    let err = store
        .read(&Context::background(), dir.path(), Some(registry.as_ref()))
        .unwrap_err();

    assert_eq!(err.name_chain(), vec!["c", "b", "a/a"]);
    assert_eq!(
        err.to_string(),
        "retrieve \"c\" by name: retrieve \"b\" by name: retrieve \"a/a\" by name: \
         cannot inject \"a/a\" without a file, default, or rebuilder"
    );
    assert!(store.root().hash.is_none(), "failed read leaves root unpinned");
}

#[test]
fn test_slug_collision_detected_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(
        Registry::builder()
            .default_value("a b", "spaced")
            .default_value("a_b", "underscored")
            .build()
            .unwrap(),
    );

    let mut store = AssetStore::new(registry.clone()).with_root("a b");
    store
        .read(&Context::background(), dir.path(), Some(registry.as_ref()))
        .unwrap();
    write(&store, dir.path(), false);

    let mut other = AssetStore::new(registry.clone()).with_root("a_b");
    let err = other
        .read(&Context::background(), dir.path(), Some(registry.as_ref()))
        .unwrap_err();
    assert!(matches!(err.root_cause(), AssetError::NameMismatch { .. }));
}

#[test]
fn test_pinned_root_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let registry = chain_registry();

    let mut store = read(dir.path(), &registry);
    let pinned = store.root().hash.unwrap();
    store.set_root(Reference::by_hash(pinned));
    store.rebuild(&Context::background(), None).unwrap();
    assert_eq!(store.root().name, "c");
    assert_eq!(store.root().hash, Some(pinned));

    write(&store, dir.path(), false);
    assert_eq!(
        fs::read_to_string(dir.path().join("c")).unwrap(),
        "a-data, modified by b, modified by c"
    );
}
