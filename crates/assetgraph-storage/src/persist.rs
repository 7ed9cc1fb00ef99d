//! Directory-backed persistence with drift detection.
//!
//! # Layout
//!
//! For an asset directory `D`, an asset named `N` occupies two files:
//! - `D/<slug(N)>`: the raw payload
//! - `D/.state/<slug(N)>`: its [`AssetRecord`] as pretty JSON
//!
//! # Drift
//!
//! The record carries a digest of the payload. When the payload on disk no
//! longer matches it (a human edited the file), or the payload exists with
//! no record at all, the loaded asset is frozen: its parents are dropped
//! and it re-emits the on-disk bytes on every future rebuild.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use assetgraph_core::slug::{self, STATE_DIR};
use assetgraph_core::{
    Asset, AssetError, AssetHash, AssetRecord, Context, DefaultProvider, HashResolver,
};

use crate::prune::prune_directory;
use crate::rebuild::Injector;
use crate::registry::Registry;
use crate::report::RebuildReport;
use crate::store::AssetStore;

fn create_parent_dir(path: &Path) -> Result<(), AssetError> {
    match path.parent() {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| AssetError::io("create directory", parent, e))
        }
        None => Ok(()),
    }
}

/// Reads the metadata record at `state_path`, `None` if there is none.
fn load_record(state_path: &Path) -> Result<Option<AssetRecord>, AssetError> {
    let bytes = match fs::read(state_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AssetError::io("read", state_path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| AssetError::Serialization {
            what: state_path.display().to_string(),
            source,
        })
}

fn check_name(state_path: &Path, record: &AssetRecord, name: &str) -> Result<(), AssetError> {
    if record.name == name {
        return Ok(());
    }
    Err(AssetError::NameMismatch {
        path: state_path.to_path_buf(),
        expected: name.to_string(),
        found: record.name.clone(),
    })
}

/// Writes `asset`'s payload and metadata under `dir`.
///
/// With a `resolver`, every parent is resolved by hash and written too, so
/// writing the root writes the whole reachable graph. Relative paths of
/// the files written are added to `written`. An asset whose payload path is
/// already in `written` is skipped if the record there carries its name, and
/// fails with a name mismatch if another name got the same path.
pub fn write_asset(
    ctx: &Context,
    dir: &Path,
    asset: &Asset,
    resolver: Option<&dyn HashResolver>,
    mut written: Option<&mut BTreeSet<PathBuf>>,
) -> Result<(), AssetError> {
    ctx.check()?;
    let data_rel = slug::data_path(&asset.name);
    let state_rel = slug::state_path(&asset.name);
    if written.as_deref().is_some_and(|w| w.contains(&data_rel)) {
        let state_path = dir.join(&state_rel);
        if let Some(record) = load_record(&state_path)? {
            check_name(&state_path, &record, &asset.name)?;
        }
        return Ok(());
    }

    let data_path = dir.join(&data_rel);
    create_parent_dir(&data_path)?;
    fs::write(&data_path, &asset.data).map_err(|e| AssetError::io("write", &data_path, e))?;

    let state_path = dir.join(&state_rel);
    create_parent_dir(&state_path)?;
    let mut metadata =
        serde_json::to_vec_pretty(&asset.record()).map_err(|source| AssetError::Serialization {
            what: state_path.display().to_string(),
            source,
        })?;
    metadata.push(b'\n');
    fs::write(&state_path, metadata).map_err(|e| AssetError::io("write", &state_path, e))?;
    debug!(asset = %asset.name, path = %data_rel.display(), "wrote asset");

    if let Some(written) = written.as_deref_mut() {
        written.insert(data_rel);
        written.insert(state_rel);
    }

    let Some(resolver) = resolver else {
        return Ok(());
    };
    for parent in &asset.parents {
        let Some(hash) = parent.hash else {
            return Err(AssetError::by_name(
                &parent.name,
                AssetError::not_found(format!("hash for parent of {:?}", asset.name)),
            ));
        };
        let parent_asset = resolver
            .resolve_hash(ctx, &hash)
            .map_err(|err| AssetError::by_hash(hash, err))?;
        write_asset(ctx, dir, &parent_asset, Some(resolver), written.as_deref_mut())
            .map_err(|err| AssetError::by_name(&parent.name, err))?;
    }
    Ok(())
}

/// Loads the asset named `name` from `dir`, freezing it if its payload
/// drifted from the recorded state.
///
/// Fails with not-found when the payload file is absent. Frozen assets come
/// back with a constant rebuild helper; others come back without one.
pub fn read_asset(ctx: &Context, dir: &Path, name: &str) -> Result<Asset, AssetError> {
    ctx.check()?;
    let state_path = dir.join(slug::state_path(name));
    let record = load_record(&state_path)?;
    if let Some(record) = &record {
        check_name(&state_path, record, name)?;
    }

    let data_path = dir.join(slug::data_path(name));
    let data = fs::read(&data_path).map_err(|e| AssetError::io("read", &data_path, e))?;

    let mut asset = Asset::new(name);
    match record {
        None => {
            info!(asset = name, "no recorded state for on-disk data, freezing");
            asset.freeze(data);
        }
        Some(record) if record.data_digest != AssetHash::of(&data) => {
            info!(asset = name, "on-disk data differs from recorded state, freezing");
            asset.freeze(data);
        }
        Some(record) if record.frozen => asset.freeze(data),
        Some(record) => {
            asset.data = data;
            asset.parents = record.parents;
        }
    }
    Ok(asset)
}

/// Injects assets from a directory, falling back to defaults and the
/// registry.
///
/// Order for a name:
/// 1. the on-disk copy ([`read_asset`])
/// 2. if absent on disk, the default value (a soft, unfrozen constant)
/// 3. a registered rebuild helper, if nothing above attached one
/// 4. for an on-disk copy with no registered helper, the default value
pub struct DirectoryInjector<'a> {
    dir: &'a Path,
    registry: &'a Registry,
    defaults: Option<&'a dyn DefaultProvider>,
}

impl<'a> DirectoryInjector<'a> {
    pub fn new(
        dir: &'a Path,
        registry: &'a Registry,
        defaults: Option<&'a dyn DefaultProvider>,
    ) -> Self {
        DirectoryInjector {
            dir,
            registry,
            defaults,
        }
    }

    fn default_value(&self, ctx: &Context, name: &str) -> Result<Option<Vec<u8>>, AssetError> {
        let Some(defaults) = self.defaults else {
            return Ok(None);
        };
        match defaults.default_for(ctx, name) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Injector for DirectoryInjector<'_> {
    fn inject(&mut self, ctx: &Context, name: &str) -> Result<Asset, AssetError> {
        let on_disk = match read_asset(ctx, self.dir, name) {
            Ok(asset) => Some(asset),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };
        let from_disk = on_disk.is_some();

        let mut asset = match on_disk {
            Some(asset) => asset,
            None => match self.default_value(ctx, name)? {
                Some(data) => {
                    debug!(asset = name, "using default value");
                    Asset::constant(name, data, false)
                }
                None => Asset::new(name),
            },
        };
        if asset.has_rebuilder() {
            return Ok(asset);
        }

        if let Some(rebuilder) = self.registry.rebuilder(name) {
            asset.set_rebuilder(Some(rebuilder));
            return Ok(asset);
        }
        if from_disk {
            if let Some(data) = self.default_value(ctx, name)? {
                return Ok(Asset::constant(name, data, false));
            }
        }
        Err(AssetError::Uninjectable {
            name: name.to_string(),
        })
    }
}

impl AssetStore {
    /// Loads the root's dependency closure from `dir` and rebuilds it.
    ///
    /// Each name is taken from disk when present (freezing drifted files),
    /// otherwise from `defaults`, otherwise from the store's registry.
    pub fn read(
        &mut self,
        ctx: &Context,
        dir: &Path,
        defaults: Option<&dyn DefaultProvider>,
    ) -> Result<RebuildReport, AssetError> {
        let registry = self.registry.clone();
        let mut injector = DirectoryInjector::new(dir, &registry, defaults);
        self.rebuild(ctx, Some(&mut injector))
    }

    /// Writes the graph reachable from the pinned root into `dir`.
    ///
    /// Returns the set of relative paths that belong to the graph: every
    /// payload and metadata file plus their ancestor directories. With
    /// `prune`, everything else under `dir` is deleted, subject to the
    /// configured [`PrunePolicy`](crate::config::PrunePolicy).
    pub fn write(
        &self,
        ctx: &Context,
        dir: &Path,
        prune: bool,
    ) -> Result<BTreeSet<PathBuf>, AssetError> {
        let state_dir = dir.join(STATE_DIR);
        fs::create_dir_all(&state_dir)
            .map_err(|e| AssetError::io("create directory", &state_dir, e))?;

        let mut written = BTreeSet::new();
        if let Some(hash) = self.root.hash {
            let root = self
                .get_by_hash(&hash)
                .map_err(|err| AssetError::by_hash(hash, err))?;
            write_asset(ctx, dir, &root, Some(self), Some(&mut written))
                .map_err(|err| AssetError::by_name(&root.name, err))?;
        }

        written.insert(PathBuf::from(STATE_DIR));
        let ancestors: Vec<PathBuf> = written
            .iter()
            .flat_map(|path| path.ancestors().skip(1))
            .filter(|ancestor| !ancestor.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect();
        written.extend(ancestors);

        if prune {
            prune_directory(dir, &written, self.config.prune_policy)?;
        }
        Ok(written)
    }
}
