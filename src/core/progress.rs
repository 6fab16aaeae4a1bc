//! Progress reporting seam.
//!
//! The engine never renders progress itself; it reports to an injected
//! [`ProgressSink`]. [`NoopProgress`] is always acceptable. The CLI plugs in
//! an indicatif bar from [`crate::utils::progress`].

/// Bytes received so far for the archive download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes written to the staging file so far
    pub bytes_transferred: u64,
    /// Total size when the server announced one
    pub total_bytes: Option<u64>,
}

/// Receiver for progress events.
///
/// Callbacks run on the task doing the I/O and must return quickly.
pub trait ProgressSink: Send + Sync {
    /// Download progress. Byte counts never decrease within one fetch.
    fn on_transfer(&self, progress: TransferProgress);

    /// Merge progress: `done` of `total` file operations applied.
    fn on_apply(&self, done: usize, total: usize) {
        let _ = (done, total);
    }

    /// A pipeline phase finished; the sink may clear its display.
    fn on_phase_end(&self) {}
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_transfer(&self, _progress: TransferProgress) {}
}
