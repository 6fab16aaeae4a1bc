//! Merge lifecycle.
//!
//! ```text
//! Planning ──▶ BackingUp ──▶ Applying ──▶ Committed
//!     │            │             │
//!     └────────────┴─────────────┴──▶ Aborted(reason)
//! ```

use std::fmt;
use thiserror::Error;

/// Why a merge stopped before committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Snapshot failed; nothing was changed.
    BackupFailed,
    /// A file operation failed; the installation was restored.
    ApplyFailed,
    /// Cancellation was requested; any change was restored.
    Cancelled,
    /// Restoring after a failure failed too.
    RollbackFailed,
}

/// Where a merge is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Planning,
    BackingUp,
    Applying,
    Committed,
    Aborted(AbortReason),
}

/// Attempted transition the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal merge transition from {from} to {to}")]
pub struct IllegalTransition {
    pub from: MergeState,
    pub to: MergeState,
}

impl MergeState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted(_))
    }

    /// Whether `self -> next` is a legal step.
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Planning, Self::BackingUp)
            | (Self::BackingUp, Self::Applying)
            | (Self::Applying, Self::Committed) => true,
            (from, Self::Aborted(_)) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Returns `next` when the step is legal.
    pub const fn transition(self, next: Self) -> Result<Self, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => f.write_str("planning"),
            Self::BackingUp => f.write_str("backing-up"),
            Self::Applying => f.write_str("applying"),
            Self::Committed => f.write_str("committed"),
            Self::Aborted(reason) => write!(f, "aborted({reason:?})"),
        }
    }
}
