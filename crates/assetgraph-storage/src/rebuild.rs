//! The rebuild engine.
//!
//! A rebuild pass starts at the store's root and recomputes every asset in
//! its dependency closure. Recursion is driven by the rebuild helpers
//! themselves: each helper resolves its parents through the
//! [`RebuildSession`] it is handed, and the session rebuilds any name it has
//! not yet seen in this pass before returning it.
//!
//! # Memoization
//!
//! The session carries a per-pass [`RebuildLog`]. A name is rebuilt at most
//! once per pass; later requests are served from the store's by-name index,
//! which the first rebuild populated. Because every node is recomputed and
//! compared against the version it started from, a pass over unchanged
//! inputs reproduces every hash exactly.
//!
//! # Sources
//!
//! The first time a name is requested, the session starts from (in order)
//! the store's current version, the [`Injector`] (disk, defaults, registry),
//! or an empty asset. A stored version without a rebuild helper is served
//! unchanged; anything else must carry a helper.

use std::collections::HashSet;

use tracing::{debug, info};

use assetgraph_core::{Asset, AssetError, AssetHash, Context, NameResolver, Reference};

use crate::report::{RebuildLog, RebuildReport};
use crate::store::AssetStore;

/// Supplies the starting version of an asset the store does not hold.
///
/// Returns a not-found error when it has nothing for `name`; the session
/// then falls back to an empty asset. Any other error aborts the pass.
pub trait Injector {
    fn inject(&mut self, ctx: &Context, name: &str) -> Result<Asset, AssetError>;
}

/// Request context for a single rebuild pass.
///
/// Implements [`NameResolver`], so it is what rebuild helpers receive.
pub struct RebuildSession<'s, 'i> {
    store: &'s mut AssetStore,
    injector: Option<&'i mut dyn Injector>,
    log: RebuildLog,
    in_progress: HashSet<String>,
}

impl<'s, 'i> RebuildSession<'s, 'i> {
    /// Opens a pass over `store`.
    pub fn new(store: &'s mut AssetStore, injector: Option<&'i mut dyn Injector>) -> Self {
        RebuildSession {
            store,
            injector,
            log: RebuildLog::default(),
            in_progress: HashSet::new(),
        }
    }

    /// Returns the current version of `name`, rebuilding it first if this
    /// pass has not done so yet.
    pub fn get_by_name(&mut self, ctx: &Context, name: &str) -> Result<Asset, AssetError> {
        if self.log.contains(name) {
            debug!(asset = name, "reusing asset rebuilt earlier in this pass");
            return self.store.get_by_name(name);
        }
        if self.in_progress.contains(name) {
            return Err(AssetError::DependencyCycle {
                name: name.to_string(),
            });
        }

        let (start, existed) = match self.store.get_by_name(name) {
            Ok(asset) if !asset.has_rebuilder() => return self.keep_as_is(asset),
            Ok(asset) => (asset, true),
            Err(err) if err.is_not_found() => match self.inject(ctx, name)? {
                Some(asset) => (asset, true),
                None => (Asset::new(name), false),
            },
            Err(err) => return Err(err),
        };

        self.in_progress.insert(name.to_string());
        let result = self.rebuild_asset(ctx, start, existed);
        self.in_progress.remove(name);
        result.map(|(asset, _)| asset)
    }

    /// Serves a stored asset that has no rebuild helper unchanged.
    fn keep_as_is(&mut self, asset: Asset) -> Result<Asset, AssetError> {
        let hash = asset.hash()?;
        debug!(asset = %asset.name, hash = %hash.short(), "no rebuild helper, keeping stored copy");
        self.log.record(&asset.name, Some(hash), hash);
        Ok(asset)
    }

    fn inject(&mut self, ctx: &Context, name: &str) -> Result<Option<Asset>, AssetError> {
        let Some(injector) = self.injector.as_deref_mut() else {
            return Ok(None);
        };
        match injector.inject(ctx, name) {
            Ok(asset) => Ok(Some(asset)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Recomputes one asset with its rebuild helper and stores the result.
    ///
    /// Returns the new asset and its hash. When the content is unchanged the
    /// hash is identical to the starting hash, so nothing downstream sees a
    /// difference.
    pub fn rebuild_asset(
        &mut self,
        ctx: &Context,
        asset: Asset,
        existed: bool,
    ) -> Result<(Asset, AssetHash), AssetError> {
        let before = asset.hash()?;
        let Some(helper) = asset.rebuilder().cloned() else {
            return Err(AssetError::MissingRebuilder {
                name: asset.name,
                hash: before,
            });
        };

        ctx.check()?;
        debug!(asset = %asset.name, helper = %helper.describe(), "rebuilding");
        let mut rebuilt = helper.rebuild(ctx, self)?;

        if rebuilt.name != asset.name {
            return Err(AssetError::ContractViolation {
                name: asset.name,
                reason: format!("produced an asset named {:?}", rebuilt.name),
            });
        }
        if !rebuilt.has_rebuilder() {
            rebuilt.set_rebuilder(Some(helper));
        }

        let after = self.store.put(rebuilt.clone())?;
        self.log
            .record(&asset.name, existed.then_some(before), after);
        if after == before {
            debug!(asset = %asset.name, hash = %after.short(), "unchanged");
        } else {
            debug!(
                asset = %asset.name,
                before = %before.short(),
                after = %after.short(),
                "changed"
            );
        }
        Ok((rebuilt, after))
    }

    /// Closes the pass and summarises what it did.
    pub fn finish(self) -> RebuildReport {
        self.log.into_report()
    }
}

impl NameResolver for RebuildSession<'_, '_> {
    fn resolve(&mut self, ctx: &Context, name: &str) -> Result<Asset, AssetError> {
        self.get_by_name(ctx, name)
    }
}

impl AssetStore {
    /// Rebuilds the dependency closure of the root.
    ///
    /// With a pinned root hash, that exact snapshot is rebuilt; otherwise the
    /// latest version of the root name is. Afterwards the root reference
    /// names the resulting asset and hash. An empty root is a no-op.
    ///
    /// Failures are wrapped with a breadcrumb per asset on the path from the
    /// root to the failing node.
    pub fn rebuild(
        &mut self,
        ctx: &Context,
        injector: Option<&mut dyn Injector>,
    ) -> Result<RebuildReport, AssetError> {
        let ctx = match self.config.rebuild_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        };
        let root = self.root.clone();
        if root.is_empty() {
            return Ok(RebuildReport::default());
        }

        let mut session = RebuildSession::new(self, injector);
        let (asset, hash) = match root.hash {
            Some(pinned) => {
                let start = session
                    .store
                    .get_by_hash(&pinned)
                    .map_err(|err| AssetError::by_hash(pinned, err))?;
                if start.has_rebuilder() {
                    session
                        .rebuild_asset(&ctx, start, true)
                        .map_err(|err| AssetError::by_hash(pinned, err))?
                } else {
                    (session.keep_as_is(start)?, pinned)
                }
            }
            None => {
                let asset = session
                    .get_by_name(&ctx, &root.name)
                    .map_err(|err| AssetError::by_name(&root.name, err))?;
                let hash = asset.hash()?;
                (asset, hash)
            }
        };
        let report = session.finish();

        if root.hash != Some(hash) {
            info!(root = %asset.name, hash = %hash.short(), "root updated");
        }
        self.root = Reference::new(asset.name, hash);
        Ok(report)
    }
}
