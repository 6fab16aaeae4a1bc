//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a shared flag. The CLI trips it from a Ctrl-C handler;
//! the pipeline polls it at safe checkpoints (between download chunks, between
//! extracted entries, after each file-level merge operation) and never in the
//! middle of a copy.

use crate::core::error::{SyncError, SyncResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns [`SyncError::Cancelled`] once cancellation was requested.
    pub fn checkpoint(&self) -> SyncResult<()> {
        if self.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}
