//! Core types shared by every stage of the synchronization pipeline.
//!
//! - [`error`] - the [`SyncError`] taxonomy and CLI error presentation
//! - [`cancel`] - the cooperative [`CancelToken`]
//! - [`progress`] - the [`ProgressSink`] collaborator interface

pub mod cancel;
pub mod error;
pub mod progress;

pub use cancel::CancelToken;
pub use error::{ErrorClass, ErrorContext, SyncError, SyncResult, user_friendly_error};
pub use progress::{NoopProgress, ProgressSink, TransferProgress};
