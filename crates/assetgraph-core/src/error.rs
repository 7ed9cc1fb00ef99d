//! Error types for the asset graph.
//!
//! [`AssetError`] is shared by every layer (core model, rebuild engine,
//! persistence) because rebuild helpers written by asset producers return it
//! and the engine has to branch on it. Not-found is the one variant callers
//! routinely recover from; use [`AssetError::is_not_found`] rather than
//! matching, since it looks through the breadcrumb wrappers.

use std::path::PathBuf;

use thiserror::Error;

use crate::hash::AssetHash;

/// Errors produced by asset graph operations.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The name or hash is not currently known.
    #[error("{what} not found")]
    NotFound { what: String },

    /// An asset needs recomputing but has no rebuild helper attached.
    #[error("cannot rebuild {name:?} ({hash}) without a rebuild helper")]
    MissingRebuilder { name: String, hash: AssetHash },

    /// A rebuild helper broke its contract (e.g. produced the wrong asset).
    #[error("rebuild helper for {name:?} violated its contract: {reason}")]
    ContractViolation { name: String, reason: String },

    /// A metadata file recorded a different name than the one being loaded.
    #[error("{path} records asset {found:?}, expected {expected:?}")]
    NameMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// No file, default, or registered rebuilder could supply the asset.
    #[error("cannot inject {name:?} without a file, default, or rebuilder")]
    Uninjectable { name: String },

    /// An asset (transitively) depends on itself.
    #[error("dependency cycle through {name:?}")]
    DependencyCycle { name: String },

    /// The same name was registered twice for one capability.
    #[error("duplicate {kind} registration for {name:?}")]
    DuplicateRegistration { kind: &'static str, name: String },

    /// A name lookup failed somewhere below this asset.
    #[error("retrieve {name:?} by name: {source}")]
    ByName {
        name: String,
        #[source]
        source: Box<AssetError>,
    },

    /// A hash lookup failed somewhere below this asset.
    #[error("retrieve {hash} by hash: {source}")]
    ByHash {
        hash: AssetHash,
        #[source]
        source: Box<AssetError>,
    },

    /// Filesystem failure.
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error for {what}: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// The operation's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A producer-specific failure inside a rebuild helper.
    #[error("{0}")]
    Producer(String),
}

impl AssetError {
    /// Creates a not-found error for the given subject.
    pub fn not_found(what: impl Into<String>) -> Self {
        AssetError::NotFound { what: what.into() }
    }

    /// Wraps `source` with a by-name breadcrumb.
    pub fn by_name(name: impl Into<String>, source: AssetError) -> Self {
        AssetError::ByName {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Wraps `source` with a by-hash breadcrumb.
    pub fn by_hash(hash: AssetHash, source: AssetError) -> Self {
        AssetError::ByHash {
            hash,
            source: Box::new(source),
        }
    }

    /// Builds an I/O error carrying the failing operation and path.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        // A missing file is the canonical not-found signal.
        if source.kind() == std::io::ErrorKind::NotFound {
            return AssetError::NotFound {
                what: path.display().to_string(),
            };
        }
        AssetError::Io { op, path, source }
    }

    /// Returns true if this error, or the innermost cause behind its
    /// breadcrumbs, is a not-found signal.
    pub fn is_not_found(&self) -> bool {
        match self {
            AssetError::NotFound { .. } => true,
            AssetError::ByName { source, .. } | AssetError::ByHash { source, .. } => {
                source.is_not_found()
            }
            _ => false,
        }
    }

    /// Returns the innermost error behind the breadcrumbs.
    pub fn root_cause(&self) -> &AssetError {
        match self {
            AssetError::ByName { source, .. } | AssetError::ByHash { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Returns the chain of asset names recorded by by-name breadcrumbs,
    /// outermost first.
    pub fn name_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self;
        loop {
            match current {
                AssetError::ByName { name, source } => {
                    chain.push(name.as_str());
                    current = source;
                }
                AssetError::ByHash { source, .. } => current = source,
                _ => return chain,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_seen_through_breadcrumbs() {
        let err = AssetError::by_name(
            "c",
            AssetError::by_name("b", AssetError::not_found("\"a\"")),
        );
        assert!(err.is_not_found());
        assert_eq!(err.name_chain(), vec!["c", "b"]);
        assert!(matches!(err.root_cause(), AssetError::NotFound { .. }));
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let err = AssetError::by_name("c", AssetError::Uninjectable { name: "a".into() });
        assert!(!err.is_not_found());
        assert!(!AssetError::Cancelled.is_not_found());
    }

    #[test]
    fn test_breadcrumb_message() {
        let err = AssetError::by_name(
            "c",
            AssetError::by_name("b", AssetError::Uninjectable { name: "a/a".into() }),
        );
        assert_eq!(
            err.to_string(),
            "retrieve \"c\" by name: retrieve \"b\" by name: cannot inject \"a/a\" without a file, default, or rebuilder"
        );
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = AssetError::io(
            "read",
            "/nonexistent",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());

        let err = AssetError::io(
            "read",
            "/forbidden",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_not_found());
    }
}
