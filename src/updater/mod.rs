//! The update pipeline.
//!
//! ```text
//! run lock ─▶ probe ─▶ (update needed?) ─▶ fetch ─▶ inspect ─▶ merge ─▶ commit state
//!                 └──────────── up to date ─────────────────────────────────┘
//! ```
//!
//! Each step is awaited before the next starts. Blocking work (extraction,
//! hashing, copying) runs on tokio's blocking pool. The downloaded archive and
//! the stage directory are removed when the run ends, whatever the outcome.

use crate::archive::{ArchiveContents, inspect_archive};
use crate::backup::BackupManager;
use crate::cache::{CacheLayout, RunLock};
use crate::config::SyncSettings;
use crate::constants::RUN_LOCK_NAME;
use crate::core::{CancelToken, ProgressSink, SyncError, SyncResult};
use crate::merge::{MergeEngine, MergeReport, RealFileOps};
use crate::remote::{
    ArtifactFetcher, FetchResult, RemoteProbe, VersionToken, http_client, is_update_available,
    resolve_remote_version,
};
use crate::state::{InstallState, StateStore};
use crate::utils::fs::is_single_folder_name;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Caller choices for one update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Sync even when the remote version matches the recorded one
    pub force: bool,
    /// Folder name to install under instead of the one found in the archive
    pub install_name: Option<String>,
}

/// How an update run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The recorded version matches the remote; nothing was touched.
    UpToDate {
        state: InstallState,
    },
    /// The merge committed and the new state was recorded.
    Updated {
        report: MergeReport,
        state: InstallState,
    },
}

/// Result of a read-only remote check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub probe: RemoteProbe,
    pub installed: Option<InstallState>,
    /// `None` when the server sends no version headers, so only a download
    /// could tell
    pub update_available: Option<bool>,
}

/// Runs checks and updates for one configured episode.
pub struct EpisodeUpdater {
    settings: SyncSettings,
    client: reqwest::Client,
    cache: CacheLayout,
    backups: BackupManager,
    state: StateStore,
}

impl EpisodeUpdater {
    pub fn new(settings: SyncSettings) -> SyncResult<Self> {
        let client = http_client(settings.timeout)?;
        let cache = CacheLayout::new(settings.paths.cache_dir());
        let backups = BackupManager::new(settings.paths.backups_dir());
        let state = StateStore::new(settings.paths.state_file());
        Ok(Self {
            settings,
            client,
            cache,
            backups,
            state,
        })
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub const fn state_store(&self) -> &StateStore {
        &self.state
    }

    pub const fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Probes the remote and compares it with the recorded state. Never
    /// downloads the archive body or touches the installation.
    pub async fn check(&self) -> SyncResult<CheckReport> {
        let url = &self.settings.episode_url;
        let probe = resolve_remote_version(&self.client, url).await?;
        let installed = self.state.load();

        let update_available = match (&installed, &probe.version) {
            (None, _) => Some(true),
            (Some(state), _) if !self.recorded_install_matches(state) => Some(true),
            (Some(state), Some(remote)) => Some(is_update_available(Some(&state.version), remote)),
            (Some(_), None) => None,
        };

        Ok(CheckReport {
            probe,
            installed,
            update_available,
        })
    }

    /// Runs the full pipeline.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`]; see the variant docs for what each leaves behind.
    pub async fn update(
        &self,
        options: &UpdateOptions,
        progress: Arc<dyn ProgressSink>,
        cancel: &CancelToken,
    ) -> SyncResult<UpdateOutcome> {
        if let Some(name) = &options.install_name {
            validate_install_name(name)?;
        }
        if !self.settings.episodes_dir.is_dir() {
            return Err(SyncError::config(format!(
                "Episodes directory {} does not exist",
                self.settings.episodes_dir.display()
            )));
        }

        let _lock = RunLock::acquire(&self.cache.locks_dir(), RUN_LOCK_NAME).await?;
        self.cache.clear_stale();

        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let stage = self.cache.stage_root().join(&run_id);

        let result = self.run_locked(options, progress, cancel, &run_id).await;

        self.cache.remove_stage(&stage);
        self.cache.remove_download();
        result
    }

    async fn run_locked(
        &self,
        options: &UpdateOptions,
        progress: Arc<dyn ProgressSink>,
        cancel: &CancelToken,
        run_id: &str,
    ) -> SyncResult<UpdateOutcome> {
        let url = self.settings.episode_url.as_str();
        let previous = self.state.load();

        info!("Checking {} for updates", url);
        let probe = resolve_remote_version(&self.client, url).await?;
        if let Some(state) = self.up_to_date(previous.as_ref(), probe.version.as_ref(), options) {
            info!(version = %state.version, "Episode is up to date");
            return Ok(UpdateOutcome::UpToDate {
                state: state.clone(),
            });
        }
        cancel.checkpoint()?;

        info!("Downloading {}", url);
        let fetcher = ArtifactFetcher::new(self.client.clone(), self.settings.retry);
        let fetched = fetcher.fetch(url, &self.cache.download_path(), progress.as_ref(), cancel).await?;
        let version = fetched.version.clone().or(probe.version).unwrap_or_else(|| {
            VersionToken::ContentHash(fetched.sha256.clone())
        });

        if let Some(state) = self.up_to_date(previous.as_ref(), Some(&version), options) {
            info!(version = %state.version, "Downloaded archive matches the installed version");
            return Ok(UpdateOutcome::UpToDate {
                state: state.clone(),
            });
        }

        let stage = self.cache.create_stage(run_id)?;
        let contents = self.inspect(&fetched, &stage, cancel).await?;

        let episode_name = options.install_name.clone().unwrap_or(contents.episode_name.clone());
        validate_install_name(&episode_name)?;
        let install_dir = self.settings.episodes_dir.join(&episode_name);
        info!("Merging '{}' into {}", episode_name, install_dir.display());

        let report = self.merge(&contents, &install_dir, &episode_name, progress, cancel).await?;

        let state = InstallState {
            version,
            archive_sha256: fetched.sha256.clone(),
            archive_name: fetched.file_name.clone(),
            source_url: url.to_string(),
            episode_name,
            install_dir,
            installed_at: Utc::now(),
        };
        if let Err(e) = self.state.commit(&state) {
            warn!("Episode files were merged but the state could not be recorded: {}", e);
            return Err(e);
        }

        let backups = self.backups.clone();
        let retention = self.settings.backup_retention;
        let _ = tokio::task::spawn_blocking(move || backups.prune(retention)).await;

        info!(
            version = %state.version,
            changed = report.changed(),
            "Update complete"
        );
        Ok(UpdateOutcome::Updated {
            report,
            state,
        })
    }

    /// Returns the recorded state when it already reflects `remote`.
    fn up_to_date<'s>(
        &self,
        previous: Option<&'s InstallState>,
        remote: Option<&VersionToken>,
        options: &UpdateOptions,
    ) -> Option<&'s InstallState> {
        if options.force {
            return None;
        }
        let state = previous?;
        let remote = remote?;
        let name_matches =
            options.install_name.as_ref().is_none_or(|name| *name == state.episode_name);

        (name_matches
            && self.recorded_install_matches(state)
            && !is_update_available(Some(&state.version), remote))
        .then_some(state)
    }

    /// Whether the recorded install came from the configured URL into the
    /// configured directory and still exists.
    fn recorded_install_matches(&self, state: &InstallState) -> bool {
        state.source_url == self.settings.episode_url
            && state.install_dir.parent() == Some(self.settings.episodes_dir.as_path())
            && state.install_dir.is_dir()
    }

    async fn inspect(
        &self,
        fetched: &FetchResult,
        stage: &Path,
        cancel: &CancelToken,
    ) -> SyncResult<ArchiveContents> {
        let archive = fetched.path.clone();
        let archive_name = fetched.file_name.clone();
        let stage = stage.to_path_buf();
        let cancel = cancel.clone();

        run_blocking("inspect archive", move || {
            inspect_archive(&archive, &archive_name, &stage, &cancel)
        })
        .await
    }

    async fn merge(
        &self,
        contents: &ArchiveContents,
        install_dir: &Path,
        episode_name: &str,
        progress: Arc<dyn ProgressSink>,
        cancel: &CancelToken,
    ) -> SyncResult<MergeReport> {
        let backups = self.backups.clone();
        let matcher = self.settings.matcher.clone();
        let source_root = contents.episode_root.clone();
        let install_dir = install_dir.to_path_buf();
        let episode_name = episode_name.to_string();
        let cancel = cancel.clone();

        run_blocking("merge episode", move || {
            let mut engine = MergeEngine::new(&RealFileOps, &backups, &matcher);
            engine.run(&source_root, &install_dir, &episode_name, progress.as_ref(), &cancel)
        })
        .await
    }
}

/// Runs blocking work on the blocking pool.
async fn run_blocking<T, F>(what: &'static str, work: F) -> SyncResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> SyncResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SyncError::io(what, PathBuf::new(), std::io::Error::other(e)))?
}

/// An install name must be one plain folder name.
fn validate_install_name(name: &str) -> SyncResult<()> {
    if is_single_folder_name(name) {
        Ok(())
    } else {
        Err(SyncError::config(format!("Install name '{name}' must be a single folder name")))
    }
}
