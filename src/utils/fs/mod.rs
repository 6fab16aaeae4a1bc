//! File system utilities.
//!
//! Everything that mutates an installed episode goes through these helpers:
//! writes and copies are atomic (temp sibling plus rename), directory creation
//! is tracked so it can be undone, and digests stream rather than buffer.
//!
//! Functions return [`std::io::Result`]; callers map failures onto the
//! [`crate::core::SyncError`] variant that fits their phase.

pub mod atomic;
pub mod dirs;
pub mod metadata;
pub mod paths;

pub use atomic::{atomic_write, copy_atomic, temp_sibling};
pub use dirs::{create_dir_all_tracked, prune_empty_parents, remove_dir_all, remove_file_if_exists};
pub use metadata::{FileDigest, calculate_checksum, file_digest, probe_case_insensitive};
pub use paths::{is_single_folder_name, join_slash_path, to_slash_path};
