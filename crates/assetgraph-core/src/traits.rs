//! Capabilities exchanged between the engine and asset producers.
//!
//! Producers implement [`Rebuild`] (how to compute an asset from its parents)
//! and [`DefaultValue`] (a fallback payload for a leaf). The engine supplies
//! a [`NameResolver`] to every rebuild helper; resolving a name through it is
//! what drives recursion into ancestors.

use std::fmt;

use crate::asset::Asset;
use crate::context::Context;
use crate::error::AssetError;
use crate::hash::AssetHash;

/// Maps an asset name to its current version.
///
/// Fails with a not-found error (see [`AssetError::is_not_found`]) when the
/// name is unknown. Takes `&mut self` because resolving may rebuild and
/// store ancestors.
pub trait NameResolver {
    fn resolve(&mut self, ctx: &Context, name: &str) -> Result<Asset, AssetError>;
}

/// Maps a content hash to the asset stored under it.
pub trait HashResolver {
    fn resolve_hash(&self, ctx: &Context, hash: &AssetHash) -> Result<Asset, AssetError>;
}

/// Recomputes an asset from the current values of its parents.
///
/// Implementations declare their dependencies by calling
/// [`Asset::get_parents`] on the asset they are building, which both fetches
/// the parent data and records provenance.
pub trait Rebuild: Send + Sync {
    fn rebuild(&self, ctx: &Context, resolver: &mut dyn NameResolver) -> Result<Asset, AssetError>;

    /// Short description for diagnostics.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<F> Rebuild for F
where
    F: Fn(&Context, &mut dyn NameResolver) -> Result<Asset, AssetError> + Send + Sync,
{
    fn rebuild(&self, ctx: &Context, resolver: &mut dyn NameResolver) -> Result<Asset, AssetError> {
        self(ctx, resolver)
    }

    fn describe(&self) -> String {
        "closure".to_string()
    }
}

impl fmt::Debug for dyn Rebuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rebuild({})", self.describe())
    }
}

/// Supplies a default payload for a single asset.
///
/// Fails with not-found when no default applies.
pub trait DefaultValue: Send + Sync {
    fn value(&self, ctx: &Context) -> Result<Vec<u8>, AssetError>;
}

impl DefaultValue for Vec<u8> {
    fn value(&self, _ctx: &Context) -> Result<Vec<u8>, AssetError> {
        Ok(self.clone())
    }
}

impl DefaultValue for &'static str {
    fn value(&self, _ctx: &Context) -> Result<Vec<u8>, AssetError> {
        Ok(self.as_bytes().to_vec())
    }
}

impl DefaultValue for String {
    fn value(&self, _ctx: &Context) -> Result<Vec<u8>, AssetError> {
        Ok(self.as_bytes().to_vec())
    }
}

/// Looks up default payloads by asset name.
pub trait DefaultProvider {
    fn default_for(&self, ctx: &Context, name: &str) -> Result<Vec<u8>, AssetError>;
}
