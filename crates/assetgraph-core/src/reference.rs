//! (name, hash) pointers between assets.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::AssetHash;

/// A pointer to an asset by name, by hash, or both.
///
/// Parent references always carry both: the hash pins the exact version of
/// the parent that was used. A root reference may carry only a name
/// ("whatever the latest version is") or only a hash (a pinned snapshot).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<AssetHash>,
}

impl Reference {
    /// A reference to the latest version of `name`.
    pub fn by_name(name: impl Into<String>) -> Self {
        Reference {
            name: name.into(),
            hash: None,
        }
    }

    /// A reference pinned to `hash`.
    pub fn by_hash(hash: AssetHash) -> Self {
        Reference {
            name: String::new(),
            hash: Some(hash),
        }
    }

    /// A fully-specified reference.
    pub fn new(name: impl Into<String>, hash: AssetHash) -> Self {
        Reference {
            name: name.into(),
            hash: Some(hash),
        }
    }

    /// True if neither a name nor a hash is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.hash.is_none()
    }
}

// Ordered by name first; the hash only breaks ties so that sorting a parent
// list is fully deterministic.
impl Ord for Reference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.hash) {
            (name, Some(hash)) if !name.is_empty() => write!(f, "{name:?}@{}", hash.short()),
            (_, Some(hash)) => write!(f, "{}", hash.short()),
            (name, None) => write!(f, "{name:?}"),
        }
    }
}
