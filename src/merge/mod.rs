//! Reconciling extracted episode content into the live installation.
//!
//! A merge runs through [`MergeState`]:
//!
//! 1. **Planning**: hash both trees and compute a [`MergePlan`]
//! 2. **BackingUp**: snapshot every path the plan will touch
//! 3. **Applying**: copy, overwrite and delete through [`FileOps`]
//! 4. **Committed**: return a [`MergeReport`]
//!
//! Any failure or cancellation during Applying restores the snapshot before
//! the error is returned, so the caller sees either a fully applied plan or an
//! untouched installation. The one exception is [`SyncError::RollbackFailed`],
//! which names the backup to restore from by hand.
//!
//! The engine is blocking; the updater runs it inside `spawn_blocking`.

pub mod inventory;
pub mod ops;
pub mod plan;
pub mod state;

pub use inventory::inventory;
pub use ops::{FileOps, RealFileOps};
pub use plan::{Decision, Inventory, MergePlan, PlannedFile, compute_plan};
pub use state::{AbortReason, IllegalTransition, MergeState};

use crate::backup::{BackupHandle, BackupManager};
use crate::core::{CancelToken, ProgressSink, SyncError, SyncResult};
use crate::pattern::PreserveMatcher;
use crate::utils::fs::join_slash_path;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Result of a committed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub install_dir: PathBuf,
    pub fresh_install: bool,
    pub created: Vec<String>,
    pub overwritten: Vec<String>,
    pub deleted: Vec<String>,
    pub preserved: usize,
    pub unchanged: usize,
    /// Backup of the touched paths; `None` when nothing changed
    pub backup_id: Option<String>,
}

impl MergeReport {
    /// Number of files created, overwritten or deleted.
    pub fn changed(&self) -> usize {
        self.created.len() + self.overwritten.len() + self.deleted.len()
    }

    /// Every changed path, sorted.
    pub fn changed_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .created
            .iter()
            .chain(&self.overwritten)
            .chain(&self.deleted)
            .map(String::as_str)
            .collect();
        paths.sort_unstable();
        paths
    }
}

/// Drives one merge through its lifecycle.
pub struct MergeEngine<'a> {
    ops: &'a dyn FileOps,
    backups: &'a BackupManager,
    matcher: &'a PreserveMatcher,
    state: MergeState,
}

impl<'a> MergeEngine<'a> {
    pub fn new(ops: &'a dyn FileOps, backups: &'a BackupManager, matcher: &'a PreserveMatcher) -> Self {
        Self {
            ops,
            backups,
            matcher,
            state: MergeState::Planning,
        }
    }

    pub const fn state(&self) -> MergeState {
        self.state
    }

    fn advance(&mut self, next: MergeState) -> SyncResult<()> {
        debug!("Merge {} -> {}", self.state, next);
        self.state = self.state.transition(next).map_err(|e| SyncError::ApplyFailed {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn abort(&mut self, reason: AbortReason) {
        if self.state.can_transition_to(MergeState::Aborted(reason)) {
            self.state = MergeState::Aborted(reason);
        }
    }

    /// Merges the episode tree at `source_root` into `install_dir`.
    ///
    /// `episode` names the backup. Progress is reported once per applied
    /// operation; cancellation is observed after planning and after every
    /// applied operation.
    pub fn run(
        &mut self,
        source_root: &Path,
        install_dir: &Path,
        episode: &str,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> SyncResult<MergeReport> {
        // Planning
        let plan = match self.plan(source_root, install_dir, cancel) {
            Ok(plan) => plan,
            Err(e) => {
                self.abort(abort_reason_for(&e));
                return Err(e);
            }
        };
        info!(
            create = plan.count(Decision::Create),
            overwrite = plan.count(Decision::Overwrite),
            delete = plan.count(Decision::DeleteMissing),
            preserved = plan.count(Decision::SkipPreserved),
            unchanged = plan.count(Decision::Unchanged),
            "Planned merge into {}",
            install_dir.display()
        );

        // BackingUp
        self.advance(MergeState::BackingUp)?;
        let backup = if plan.is_noop() {
            None
        } else {
            match self.backups.snapshot(install_dir, episode, &plan.touched_paths()) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!("Backup failed, nothing was changed: {}", e);
                    self.abort(AbortReason::BackupFailed);
                    return Err(e);
                }
            }
        };

        // Applying
        self.advance(MergeState::Applying)?;
        if let Err(cause) = self.apply(&plan, source_root, install_dir, progress, cancel) {
            return Err(self.roll_back(backup.as_ref(), cause));
        }

        self.advance(MergeState::Committed)?;
        let report = build_report(&plan, install_dir, backup.as_ref());
        info!(
            changed = report.changed(),
            backup = ?report.backup_id,
            "Merge committed"
        );
        Ok(report)
    }

    fn plan(&self, source_root: &Path, install_dir: &Path, cancel: &CancelToken) -> SyncResult<MergePlan> {
        let incoming = inventory(source_root, cancel)?;
        let local = if install_dir.is_dir() {
            Some(inventory(install_dir, cancel)?)
        } else {
            None
        };
        let plan = compute_plan(&incoming, local.as_ref(), self.matcher);
        cancel.checkpoint()?;
        Ok(plan)
    }

    fn apply(
        &self,
        plan: &MergePlan,
        source_root: &Path,
        install_dir: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> SyncResult<()> {
        let total = plan.operations().count();
        cancel.checkpoint()?;

        for (index, file) in plan.operations().enumerate() {
            let target = join_slash_path(install_dir, &file.path);
            let result = match (file.decision, file.source.as_deref()) {
                (Decision::Create | Decision::Overwrite, Some(source)) => {
                    debug!("{:?} {}", file.decision, file.path);
                    self.ops.write_file(&join_slash_path(source_root, source), &target)
                }
                (Decision::DeleteMissing, _) => {
                    debug!("Deleting {}", file.path);
                    self.ops.remove_file(&target).map(|()| {
                        if let Some(parent) = target.parent() {
                            self.ops.prune_empty_dirs(parent, install_dir);
                        }
                    })
                }
                _ => Ok(()),
            };

            result.map_err(|e| SyncError::ApplyFailed {
                path: target.clone(),
                reason: e.to_string(),
            })?;

            progress.on_apply(index + 1, total);
            cancel.checkpoint()?;
        }

        progress.on_phase_end();
        Ok(())
    }

    /// Restores the snapshot after `cause` interrupted Applying.
    fn roll_back(&mut self, backup: Option<&BackupHandle>, cause: SyncError) -> SyncError {
        error!("Merge interrupted, rolling back: {}", cause);
        let Some(handle) = backup else {
            self.abort(abort_reason_for(&cause));
            return cause;
        };

        match self.backups.restore(handle) {
            Ok(()) => {
                if let Err(e) = self.backups.discard(handle) {
                    warn!("Failed to remove backup after rollback: {}", e);
                }
                self.abort(abort_reason_for(&cause));
                cause
            }
            Err(restore_error) => {
                self.abort(AbortReason::RollbackFailed);
                SyncError::RollbackFailed {
                    backup_dir: handle.dir().to_path_buf(),
                    cause: cause.to_string(),
                    reason: restore_error.to_string(),
                }
            }
        }
    }
}

fn abort_reason_for(error: &SyncError) -> AbortReason {
    match error {
        SyncError::Cancelled => AbortReason::Cancelled,
        SyncError::BackupFailed {
            ..
        } => AbortReason::BackupFailed,
        _ => AbortReason::ApplyFailed,
    }
}

fn build_report(plan: &MergePlan, install_dir: &Path, backup: Option<&BackupHandle>) -> MergeReport {
    let paths = |decision: Decision| -> Vec<String> {
        plan.files.iter().filter(|f| f.decision == decision).map(|f| f.path.clone()).collect()
    };

    MergeReport {
        install_dir: install_dir.to_path_buf(),
        fresh_install: plan.fresh_install,
        created: paths(Decision::Create),
        overwritten: paths(Decision::Overwrite),
        deleted: paths(Decision::DeleteMissing),
        preserved: plan.count(Decision::SkipPreserved),
        unchanged: plan.count(Decision::Unchanged),
        backup_id: backup.map(|h| h.id().to_string()),
    }
}
