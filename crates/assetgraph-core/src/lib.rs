//! Core data model for the asset graph.
//!
//! An [`Asset`] is a named, content-addressed unit of generated data that
//! records exactly which versions of its parents produced it. Assets are
//! linked by [`Reference`]s, hashed with blake3 into an [`AssetHash`], and
//! recomputed through the [`Rebuild`] capability.
//!
//! # Modules
//!
//! - [`asset`]: Asset and its canonical [`AssetRecord`] form
//! - [`reference`]: (name, hash) pointers
//! - [`hash`]: AssetHash newtype and digest helpers
//! - [`slug`]: filesystem path derivation from asset names
//! - [`traits`]: resolver, rebuild, and default-value capabilities
//! - [`context`]: cancellation and deadlines
//! - [`error`]: AssetError

pub mod asset;
pub mod context;
pub mod error;
pub mod hash;
pub mod reference;
pub mod slug;
pub mod traits;

pub use asset::{Asset, AssetRecord, ConstantRebuilder};
pub use context::Context;
pub use error::AssetError;
pub use hash::AssetHash;
pub use reference::Reference;
pub use traits::{DefaultProvider, DefaultValue, HashResolver, NameResolver, Rebuild};
