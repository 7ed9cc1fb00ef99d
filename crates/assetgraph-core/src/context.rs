//! Cancellation and deadlines for asset graph operations.
//!
//! Every engine operation takes a [`Context`]. The engine checks it before
//! each rebuild-helper call, so a cancelled context aborts a rebuild at the
//! next node boundary instead of completing partially. Helpers that do
//! long-running work of their own should call [`Context::check`] too.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::AssetError;

/// A cancellation token plus an optional deadline.
///
/// Cloning is cheap; clones share the same cancellation state.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Context {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Returns a child context that also expires after `timeout`.
    ///
    /// The tighter of the parent's and the new deadline wins. A timeout too
    /// large to represent as an instant adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(existing), Some(new)) => Some(existing.min(new)),
            (existing, new) => existing.or(new),
        };
        Context {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Requests cancellation of this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the context has been cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), AssetError> {
        if self.token.is_cancelled() {
            return Err(AssetError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(AssetError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::background()
    }
}
