//! Preserve-pattern matching.
//!
//! Preserve patterns name files that must survive every update: save slots,
//! progress records, anything the player produced. A file whose path relative
//! to the episode root matches any pattern is never overwritten or deleted.
//!
//! # Pattern Syntax
//!
//! Patterns are compiled with the `glob` crate and matched with
//! `require_literal_separator`, so:
//!
//! - `*` matches any run of characters within a single path component
//! - `?` matches exactly one character other than `/`
//! - `[abc]` / `[a-z]` match one character from the set
//!
//! `save*.sav` matches `save1.sav` and `saveA.sav` but not `save/1.sav` or
//! `saves/save1.sav`. Paths are normalized to `/` separators before matching,
//! so archives built on Windows behave the same.
//!
//! # Case Sensitivity
//!
//! Matching is case-sensitive unless the episode lives on a case-insensitive
//! filesystem. That decision is an explicit [`CaseSensitivity`] input: the
//! configuration may pin it, otherwise [`CaseSensitivity::detect`] probes the
//! episodes directory.

use crate::core::{SyncError, SyncResult};
use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::{debug, trace};

/// Whether path comparisons distinguish letter case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    /// `Save1.sav` and `save1.sav` are different files.
    Sensitive,
    /// Paths are folded to one case before comparing.
    Insensitive,
}

impl CaseSensitivity {
    /// Resolves case sensitivity from an optional override, probing `dir`
    /// when no override is given.
    ///
    /// A failed probe falls back to the platform convention (insensitive on
    /// Windows and macOS).
    pub fn resolve(override_sensitive: Option<bool>, dir: &Path) -> Self {
        match override_sensitive {
            Some(true) => Self::Sensitive,
            Some(false) => Self::Insensitive,
            None => Self::detect(dir),
        }
    }

    /// Probes the filesystem holding `dir`.
    pub fn detect(dir: &Path) -> Self {
        match crate::utils::fs::probe_case_insensitive(dir) {
            Ok(true) => Self::Insensitive,
            Ok(false) => Self::Sensitive,
            Err(e) => {
                debug!("Case sensitivity probe failed in {}: {e}", dir.display());
                if cfg!(any(windows, target_os = "macos")) {
                    Self::Insensitive
                } else {
                    Self::Sensitive
                }
            }
        }
    }

    /// Folds a relative path into its comparison key.
    #[must_use]
    pub fn fold(self, path: &str) -> String {
        match self {
            Self::Sensitive => path.to_string(),
            Self::Insensitive => path.to_lowercase(),
        }
    }
}

/// Compiled, ordered set of preserve patterns.
#[derive(Debug, Clone)]
pub struct PreserveMatcher {
    patterns: Vec<Pattern>,
    originals: Vec<String>,
    case: CaseSensitivity,
}

impl PreserveMatcher {
    /// Compiles `patterns`, rejecting the first invalid one.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidPattern`] when a pattern does not compile or is an
    /// absolute / parent-relative path, which could never match a path inside
    /// the episode.
    pub fn new<S: AsRef<str>>(patterns: &[S], case: CaseSensitivity) -> SyncResult<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        let mut originals = Vec::with_capacity(patterns.len());

        for raw in patterns {
            let raw = raw.as_ref();
            validate_pattern(raw)?;
            let normalized = raw.replace('\\', "/");
            let pattern = Pattern::new(&normalized).map_err(|e| SyncError::InvalidPattern {
                pattern: raw.to_string(),
                reason: e.msg.to_string(),
            })?;
            compiled.push(pattern);
            originals.push(raw.to_string());
        }

        Ok(Self {
            patterns: compiled,
            originals,
            case,
        })
    }

    /// Case sensitivity this matcher was built with.
    #[must_use]
    pub const fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    /// Patterns as written in the configuration.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.originals
    }

    /// Whether `relative_path` matches any preserve pattern.
    #[must_use]
    pub fn matches(&self, relative_path: &str) -> bool {
        let normalized = relative_path.replace('\\', "/");
        let options = MatchOptions {
            case_sensitive: self.case == CaseSensitivity::Sensitive,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let hit = self.patterns.iter().any(|p| p.matches_with(&normalized, options));
        if hit {
            trace!("Preserve pattern matched: {}", normalized);
        }
        hit
    }
}

/// Checks that `pattern` compiles as a preserve pattern.
pub fn validate_pattern(pattern: &str) -> SyncResult<()> {
    let invalid = |reason: &str| SyncError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    if pattern.trim().is_empty() {
        return Err(invalid("pattern is empty"));
    }

    let normalized = pattern.replace('\\', "/");
    if normalized.starts_with('/') || normalized.chars().nth(1) == Some(':') {
        return Err(invalid("pattern must be relative to the episode folder"));
    }
    if normalized.split('/').any(|part| part == "..") {
        return Err(invalid("pattern must not contain '..'"));
    }

    Pattern::new(&normalized).map(|_| ()).map_err(|e| invalid(e.msg))
}
