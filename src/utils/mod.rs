//! Cross-platform utilities: filesystem helpers, path expansion, and
//! terminal progress.

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, copy_atomic, file_digest, to_slash_path};
pub use platform::resolve_path;
pub use progress::{ProgressBar, TerminalProgress};
