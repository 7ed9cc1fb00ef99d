//! Evicting assets and files unreachable from the root.
//!
//! [`AssetStore::prune`] is a mark-and-sweep over the in-memory indices,
//! starting from the root hash and following parent hashes. It never fails:
//! a dangling parent hash means the store is already over-pruned on that
//! branch and is skipped.
//!
//! [`prune_directory`] is the on-disk counterpart used by
//! [`AssetStore::write`].

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use assetgraph_core::{AssetError, AssetHash};

use crate::config::PrunePolicy;
use crate::store::AssetStore;

/// What a call to [`AssetStore::prune`] evicted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneSummary {
    pub removed_hashes: BTreeSet<AssetHash>,
    pub removed_names: BTreeSet<String>,
}

impl PruneSummary {
    pub fn is_empty(&self) -> bool {
        self.removed_hashes.is_empty() && self.removed_names.is_empty()
    }
}

impl AssetStore {
    /// Drops every stored version not reachable from the root hash.
    ///
    /// Only the pinned root hash counts; a root known by name alone keeps
    /// nothing pinned, so the store is left untouched.
    pub fn prune(&mut self) -> PruneSummary {
        let Some(root) = self.root.hash else {
            debug!("root has no hash, nothing to prune");
            return PruneSummary::default();
        };

        let mut visited: HashSet<AssetHash> = HashSet::new();
        let mut current: HashSet<String> = HashSet::new();
        let mut worklist = vec![root];
        while let Some(hash) = worklist.pop() {
            if !visited.insert(hash) {
                continue;
            }
            let Some(asset) = self.by_hash.get(&hash) else {
                debug!(%hash, "dangling reference during prune");
                continue;
            };
            current.insert(asset.name.clone());
            worklist.extend(asset.parents.iter().filter_map(|parent| parent.hash));
        }

        let mut summary = PruneSummary::default();
        self.by_hash.retain(|hash, _| {
            let keep = visited.contains(hash);
            if !keep {
                summary.removed_hashes.insert(*hash);
            }
            keep
        });
        self.by_name.retain(|name, _| {
            let keep = current.contains(name);
            if !keep {
                summary.removed_names.insert(name.clone());
            }
            keep
        });

        debug!(
            removed_hashes = summary.removed_hashes.len(),
            removed_names = summary.removed_names.len(),
            "pruned store"
        );
        summary
    }
}

fn handle_failure(policy: PrunePolicy, err: AssetError) -> Result<(), AssetError> {
    match policy {
        PrunePolicy::BestEffort => {
            warn!(error = %err, "prune failed, continuing");
            Ok(())
        }
        PrunePolicy::FailFast => Err(err),
    }
}

/// Deletes everything under `dir` whose relative path is not in `keep`.
///
/// Directories not in `keep` are removed with their contents and not
/// descended into. Returns the relative paths removed.
pub fn prune_directory(
    dir: &Path,
    keep: &BTreeSet<PathBuf>,
    policy: PrunePolicy,
) -> Result<Vec<PathBuf>, AssetError> {
    let mut removed = Vec::new();
    let mut entries = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                handle_failure(policy, AssetError::io("walk", path, err.into()))?;
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if keep.contains(rel) {
            continue;
        }

        let is_dir = entry.file_type().is_dir();
        let result = if is_dir {
            fs::remove_dir_all(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        if is_dir {
            entries.skip_current_dir();
        }
        match result {
            Ok(()) => {
                debug!(path = %rel.display(), "pruned stale path");
                removed.push(rel.to_path_buf());
            }
            Err(err) => handle_failure(policy, AssetError::io("remove", entry.path(), err))?,
        }
    }
    Ok(removed)
}
