//! Single-run lock and cancellation.

use crate::common::EpisodeHost;
use epsync::cache::{CacheLayout, RunLock};
use epsync::constants::RUN_LOCK_NAME;
use epsync::core::{CancelToken, NoopProgress, SyncError};
use epsync::test_utils::{TestEnvironment, ZipFixture};
use epsync::updater::{EpisodeUpdater, UpdateOptions, UpdateOutcome};
use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_update_is_refused() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = EpisodeUpdater::new(env.settings(&env.config(&host.url())).unwrap()).unwrap();

    let cache = CacheLayout::new(env.paths().cache_dir());
    let held = RunLock::try_acquire(&cache.locks_dir(), RUN_LOCK_NAME).unwrap();

    let err = updater
        .update(&UpdateOptions::default(), Arc::new(NoopProgress), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::AlreadyInProgress { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 6);
    assert!(!env.install_dir("MyEpisode").exists());
    assert_eq!(host.archive_gets().await, 0, "the refused run must not touch the network");

    drop(held);
    let outcome = updater
        .update(&UpdateOptions::default(), Arc::new(NoopProgress), &CancelToken::new())
        .await
        .unwrap();
    assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
}

#[tokio::test]
async fn test_stale_stage_is_cleared_by_next_run() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;

    // Leftovers of a run that crashed mid-extraction
    let cache = CacheLayout::new(env.paths().cache_dir());
    let stale = cache.create_stage("crashed-run").unwrap();
    std::fs::write(stale.join("half.wld"), "partial").unwrap();
    std::fs::create_dir_all(cache.download_dir()).unwrap();
    std::fs::write(cache.download_dir().join("archive.zip.part"), "partial").unwrap();

    let updater = EpisodeUpdater::new(env.settings(&env.config(&host.url())).unwrap()).unwrap();
    updater
        .update(&UpdateOptions::default(), Arc::new(NoopProgress), &CancelToken::new())
        .await
        .unwrap();

    assert!(!stale.exists());
    assert!(!cache.download_dir().join("archive.zip.part").exists());
}

#[tokio::test]
async fn test_cancelled_run_changes_nothing() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = EpisodeUpdater::new(env.settings(&env.config(&host.url())).unwrap()).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = updater
        .update(&UpdateOptions::default(), Arc::new(NoopProgress), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Cancelled), "got {err:?}");
    assert_eq!(err.exit_code(), 130);
    assert!(!env.install_dir("MyEpisode").exists());
    assert_eq!(updater.state_store().load(), None);
}
