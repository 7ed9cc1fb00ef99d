//! What a rebuild pass changed.
//!
//! Every asset touched by a pass is recomputed, but most come out with the
//! same hash they started with. [`RebuildReport`] sorts the touched names
//! into created, changed, and fresh, relative to the version each pass
//! started from (the store's copy, the on-disk copy, or a default).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use assetgraph_core::AssetHash;

/// Per-pass record of each rebuilt name's starting and resulting hash.
///
/// `before` is `None` when no version of the asset existed at all.
#[derive(Debug, Clone, Default)]
pub(crate) struct RebuildLog {
    entries: BTreeMap<String, (Option<AssetHash>, AssetHash)>,
}

impl RebuildLog {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn record(&mut self, name: &str, before: Option<AssetHash>, after: AssetHash) {
        self.entries.insert(name.to_string(), (before, after));
    }

    pub(crate) fn into_report(self) -> RebuildReport {
        let mut report = RebuildReport::default();
        for (name, (before, after)) in self.entries {
            match before {
                None => report.created.insert(name),
                Some(before) if before != after => report.changed.insert(name),
                Some(_) => report.fresh.insert(name),
            };
        }
        report
    }
}

/// The outcome of one rebuild pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    /// Assets that had no prior version.
    pub created: BTreeSet<String>,
    /// Assets whose hash differs from the version the pass started from.
    pub changed: BTreeSet<String>,
    /// Assets recomputed to the same hash.
    pub fresh: BTreeSet<String>,
}

impl RebuildReport {
    /// True if nothing was created or changed.
    pub fn is_clean(&self) -> bool {
        self.created.is_empty() && self.changed.is_empty()
    }

    /// Every name the pass touched.
    pub fn rebuilt(&self) -> BTreeSet<&str> {
        self.created
            .iter()
            .chain(&self.changed)
            .chain(&self.fresh)
            .map(String::as_str)
            .collect()
    }

    /// Number of names the pass touched.
    pub fn total(&self) -> usize {
        self.created.len() + self.changed.len() + self.fresh.len()
    }
}
