//! Error handling for epsync
//!
//! The synchronization engine reports every failure through [`SyncError`], a
//! closed taxonomy that tells the caller whether a failure is worth retrying,
//! whether the local installation was left untouched, and whether the recorded
//! state has drifted from the files on disk. Callers decide presentation; they
//! never need to inspect message text.
//!
//! # Error Classes
//!
//! | Class | Variants | Retry? |
//! |-------|----------|--------|
//! | Transient | [`SyncError::RemoteUnavailable`], [`SyncError::FetchFailed`] | later |
//! | User configuration | [`SyncError::NotAnArchive`], [`SyncError::InvalidPattern`], [`SyncError::Config`] | no |
//! | Distributor | [`SyncError::UnsafeArchiveEntry`], [`SyncError::InvalidArchive`], [`SyncError::NoEpisodeRootFound`] | no |
//! | Local environment | [`SyncError::BackupFailed`], [`SyncError::ApplyFailed`], [`SyncError::Io`] | after fixing |
//! | Concurrency | [`SyncError::AlreadyInProgress`] | when the other run ends |
//! | Inconsistent state | [`SyncError::PersistFailed`], [`SyncError::RollbackFailed`] | needs reconciliation |
//!
//! The CLI converts errors with [`user_friendly_error`], which attaches details
//! and a suggestion and picks an exit code.
//!
//! # Examples
//!
//! ```rust,no_run
//! use epsync::core::{ErrorClass, SyncError};
//!
//! let err = SyncError::RemoteUnavailable {
//!     url: "https://example.com/ep.zip".to_string(),
//!     reason: "connection refused".to_string(),
//! };
//! assert_eq!(err.class(), ErrorClass::Transient);
//! assert!(err.is_retryable());
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results produced by the synchronization engine.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network trouble; the same run can succeed later.
    Transient,
    /// The configuration points at something unusable.
    UserConfiguration,
    /// The archive itself is malformed or unexpected.
    Distributor,
    /// The local machine refused an operation; the installation was rolled back.
    LocalEnvironment,
    /// Another update run holds the lock.
    Concurrency,
    /// Files and recorded state disagree and need reconciliation.
    InconsistentState,
    /// The user asked the run to stop.
    Cancelled,
}

/// The error type of the episode synchronization engine
///
/// Each variant is one failure mode of one pipeline stage. Variants carry the
/// URL, path or entry name involved so messages can be shown without extra
/// context.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote could not be reached to determine its version.
    #[error("Remote archive is unavailable: {url}")]
    RemoteUnavailable {
        /// URL that was probed
        url: String,
        /// Underlying network failure
        reason: String,
    },

    /// The server answered with something other than a ZIP archive.
    #[error("The URL does not serve a ZIP archive: {url}")]
    NotAnArchive {
        /// URL that was downloaded
        url: String,
        /// What was received instead (content type, leading bytes)
        detail: String,
    },

    /// Downloading failed after every allowed attempt.
    #[error("Failed to download {url} after {attempts} attempt(s)")]
    FetchFailed {
        /// URL that was downloaded
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// Failure of the last attempt
        reason: String,
    },

    /// An archive entry would be written outside the extraction directory.
    #[error("Archive entry escapes the extraction directory: {entry}")]
    UnsafeArchiveEntry {
        /// Raw entry name as stored in the archive
        entry: String,
    },

    /// The archive could not be read as a ZIP file.
    #[error("Archive is corrupt or unreadable: {reason}")]
    InvalidArchive {
        /// Reader error
        reason: String,
    },

    /// No `.wld` file exists anywhere in the archive.
    #[error("No episode found in archive {archive} (no .wld file)")]
    NoEpisodeRootFound {
        /// Path of the downloaded archive
        archive: PathBuf,
    },

    /// A file could not be snapshotted before the merge; nothing was changed.
    #[error("Failed to back up {path} before merging")]
    BackupFailed {
        /// File that could not be copied into the backup
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Applying the merge failed; the installation was rolled back.
    #[error("Failed to apply update at {path}; installation was restored")]
    ApplyFailed {
        /// File whose operation failed
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Rolling back a failed merge failed as well.
    #[error("Rollback failed; restore manually from backup {backup_dir}")]
    RollbackFailed {
        /// Backup directory holding the pre-run files
        backup_dir: PathBuf,
        /// Why the merge was being rolled back
        cause: String,
        /// Why the rollback failed
        reason: String,
    },

    /// The run was cancelled; any applied change was rolled back.
    #[error("Update cancelled")]
    Cancelled,

    /// Another update run holds the lock.
    #[error("Another update is already in progress (lock: {lock_path})")]
    AlreadyInProgress {
        /// Lock file held by the other run
        lock_path: PathBuf,
    },

    /// The merge succeeded but the install state could not be recorded.
    #[error("Episode files were updated but the install state could not be saved (version {version})")]
    PersistFailed {
        /// Version token that should have been recorded
        version: String,
        /// Underlying failure
        reason: String,
    },

    /// A preserve glob does not compile.
    #[error("Invalid preserve pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as written in the configuration
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Configuration is missing, incomplete or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// Local I/O failure outside the merge (cache, scratch, config files).
    #[error("I/O error while trying to {operation} {path}")]
    Io {
        /// What was being attempted
        operation: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Builds an [`SyncError::Io`] from an I/O error.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Builds a [`SyncError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::RemoteUnavailable {
                ..
            }
            | Self::FetchFailed {
                ..
            } => ErrorClass::Transient,
            Self::NotAnArchive {
                ..
            }
            | Self::InvalidPattern {
                ..
            }
            | Self::Config {
                ..
            } => ErrorClass::UserConfiguration,
            Self::UnsafeArchiveEntry {
                ..
            }
            | Self::InvalidArchive {
                ..
            }
            | Self::NoEpisodeRootFound {
                ..
            } => ErrorClass::Distributor,
            Self::BackupFailed {
                ..
            }
            | Self::ApplyFailed {
                ..
            }
            | Self::Io {
                ..
            } => ErrorClass::LocalEnvironment,
            Self::AlreadyInProgress {
                ..
            } => ErrorClass::Concurrency,
            Self::PersistFailed {
                ..
            }
            | Self::RollbackFailed {
                ..
            } => ErrorClass::InconsistentState,
            Self::Cancelled => ErrorClass::Cancelled,
        }
    }

    /// Whether running the same update again later may succeed unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient | ErrorClass::Concurrency)
    }

    /// Whether the files on disk and the recorded state disagree.
    #[must_use]
    pub const fn is_inconsistent_state(&self) -> bool {
        matches!(self.class(), ErrorClass::InconsistentState)
    }

    /// Process exit code used by the CLI for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.class() {
            ErrorClass::UserConfiguration => 2,
            ErrorClass::Transient => 3,
            ErrorClass::Distributor => 4,
            ErrorClass::LocalEnvironment => 5,
            ErrorClass::Concurrency => 6,
            ErrorClass::InconsistentState => 7,
            ErrorClass::Cancelled => 130,
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Wraps an error message with optional details and a suggestion. This is how
/// the CLI presents failures.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
    /// Exit code the process should terminate with
    pub exit_code: i32,
}

impl ErrorContext {
    /// Create a new error context from a message with exit code 1.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
            exit_code: 1,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Override the exit code
    #[must_use]
    pub const fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`SyncError`] anywhere in the chain (including behind
/// `anyhow::Context`) and standard I/O errors; anything else is shown with its
/// full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<SyncError>() {
        Ok(sync_error) => return create_error_context(&sync_error),
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(format!("{error:#}"))
                    .with_suggestion("Check file ownership and permissions of the episodes directory")
                    .with_details("epsync could not read or write a file it needs");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(format!("{error:#}"))
                    .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    ErrorContext::new(format!("{error:#}"))
}

fn create_error_context(error: &SyncError) -> ErrorContext {
    let ctx = ErrorContext::new(error.to_string()).with_exit_code(error.exit_code());

    match error {
        SyncError::RemoteUnavailable {
            reason,
            ..
        } => ctx
            .with_details(reason.clone())
            .with_suggestion("Check your internet connection and try again later"),

        SyncError::NotAnArchive {
            detail,
            ..
        } => ctx
            .with_details(detail.clone())
            .with_suggestion("Use a direct download link to the .zip file, not a download page. Update it with 'epsync set-url <url>'"),

        SyncError::FetchFailed {
            reason,
            ..
        } => ctx
            .with_details(reason.clone())
            .with_suggestion("Try again later; nothing was changed on disk"),

        SyncError::UnsafeArchiveEntry {
            ..
        } => ctx
            .with_details("The archive contains a path that would be written outside the episode folder")
            .with_suggestion("Report the archive to its distributor; nothing was extracted"),

        SyncError::InvalidArchive {
            ..
        } => ctx.with_suggestion("The download may be truncated. Run 'epsync update --force' to fetch it again"),

        SyncError::NoEpisodeRootFound {
            ..
        } => ctx
            .with_details("An episode archive must contain at least one .wld level file")
            .with_suggestion("Check that the configured URL points at the episode archive"),

        SyncError::BackupFailed {
            reason,
            ..
        } => ctx
            .with_details(reason.clone())
            .with_suggestion("Free disk space or fix permissions of the epsync home directory; the installation was not modified"),

        SyncError::ApplyFailed {
            reason,
            ..
        } => ctx
            .with_details(reason.clone())
            .with_suggestion("Close the game and any program using the episode folder, then run 'epsync update' again"),

        SyncError::RollbackFailed {
            backup_dir,
            cause,
            reason,
        } => ctx
            .with_details(format!("Merge failed ({cause}) and restoring the backup failed ({reason})"))
            .with_suggestion(format!(
                "Run 'epsync backups restore {}' once the problem is fixed",
                backup_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
            )),

        SyncError::Cancelled => ctx.with_details("Any change already applied was rolled back"),

        SyncError::AlreadyInProgress {
            ..
        } => ctx.with_suggestion("Wait for the other update to finish"),

        SyncError::PersistFailed {
            reason,
            ..
        } => ctx
            .with_details(format!("{reason}. The recorded version is stale, so the next update will re-sync"))
            .with_suggestion("Fix permissions of the epsync home directory and run 'epsync update'"),

        SyncError::InvalidPattern {
            ..
        } => ctx.with_suggestion("Fix the pattern with 'epsync preserve remove <glob>' or edit config.toml"),

        SyncError::Config {
            ..
        } => ctx.with_suggestion("Run 'epsync init --episodes-dir <dir> --episode-url <url>'"),

        SyncError::Io {
            source,
            ..
        } => ctx.with_details(source.to_string()),
    }
}
