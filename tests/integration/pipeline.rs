//! Full update runs through [`EpisodeUpdater`].

use crate::common::{ARCHIVE_PATH, EpisodeHost, RecordingProgress, list_files, zip_response};
use epsync::cache::CacheLayout;
use epsync::core::{CancelToken, NoopProgress, SyncError};
use epsync::merge::MergeReport;
use epsync::remote::VersionToken;
use epsync::state::InstallState;
use epsync::test_utils::{TestEnvironment, ZipFixture};
use epsync::updater::{EpisodeUpdater, UpdateOptions, UpdateOutcome};
use epsync::utils::fs::temp_sibling;
use std::sync::Arc;
use wiremock::Mock;
use wiremock::matchers::{method, path};

fn updater(env: &TestEnvironment, url: &str) -> EpisodeUpdater {
    EpisodeUpdater::new(env.settings(&env.config(url)).unwrap()).unwrap()
}

async fn run(updater: &EpisodeUpdater, options: &UpdateOptions) -> Result<UpdateOutcome, SyncError> {
    updater.update(options, Arc::new(NoopProgress), &CancelToken::new()).await
}

fn expect_updated(outcome: UpdateOutcome) -> (MergeReport, InstallState) {
    match outcome {
        UpdateOutcome::Updated {
            report,
            state,
        } => (report, state),
        other => panic!("expected an update, got {other:?}"),
    }
}

fn v2_archive() -> ZipFixture {
    ZipFixture::new()
        .file("MyEpisode/level1.wld", "level one v2")
        .file("MyEpisode/level3.wld", "level three v2")
        .file("MyEpisode/world.wwx", "world map v1")
        .file("MyEpisode/graphics/tiles.png", "tiles v1")
        .file("MyEpisode/save1.sav", "distributor default save")
}

fn assert_cache_clean(env: &TestEnvironment) {
    let cache = CacheLayout::new(env.paths().cache_dir());
    assert!(!cache.download_path().exists(), "downloaded archive must be removed");
    let leftover = std::fs::read_dir(cache.stage_root())
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0, "stage directories must be removed");
}

#[tokio::test]
async fn test_fresh_install() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;

    let updater = updater(&env, &host.url());
    let progress = Arc::new(RecordingProgress::default());
    let outcome = updater
        .update(&UpdateOptions::default(), progress.clone(), &CancelToken::new())
        .await
        .unwrap();
    let (report, state) = expect_updated(outcome);

    assert!(report.fresh_install);
    assert_eq!(report.created.len(), 4);
    assert_eq!(
        list_files(&env.install_dir("MyEpisode")),
        vec!["graphics/tiles.png", "level1.wld", "level2.wld", "world.wwx"]
    );
    assert_eq!(env.read_installed("MyEpisode", "level1.wld").unwrap(), "level one v1");

    assert_eq!(state.version, VersionToken::ETag("\"v1\"".to_string()));
    assert_eq!(state.episode_name, "MyEpisode");
    assert_eq!(state.install_dir, env.install_dir("MyEpisode"));
    assert_eq!(updater.state_store().load(), Some(state));

    assert!(!progress.transfers.lock().unwrap().is_empty());
    assert_eq!(progress.applied.lock().unwrap().last(), Some(&(4, 4)));
    assert_cache_clean(&env);
}

#[tokio::test]
async fn test_update_keeps_save_files() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = updater(&env, &host.url());
    run(&updater, &UpdateOptions::default()).await.unwrap();

    // The player plays for a while
    env.write_installed("MyEpisode", "save1.sav", "player save").unwrap();
    env.write_installed("MyEpisode", "progress.json", "{\"stars\":12}").unwrap();
    env.write_installed("MyEpisode", "notes.txt", "stray file").unwrap();

    host.publish(v2_archive().to_bytes(), "\"v2\"").await;
    let (report, state) = expect_updated(run(&updater, &UpdateOptions::default()).await.unwrap());

    assert!(!report.fresh_install);
    assert_eq!(report.created, vec!["level3.wld"]);
    assert_eq!(report.overwritten, vec!["level1.wld"]);
    assert_eq!(report.deleted, vec!["level2.wld", "notes.txt"]);
    assert_eq!(report.preserved, 2);
    assert_eq!(report.unchanged, 2);
    assert!(report.backup_id.is_some());

    assert_eq!(env.read_installed("MyEpisode", "save1.sav").unwrap(), "player save");
    assert_eq!(env.read_installed("MyEpisode", "progress.json").unwrap(), "{\"stars\":12}");
    assert_eq!(env.read_installed("MyEpisode", "level1.wld").unwrap(), "level one v2");
    assert_eq!(
        list_files(&env.install_dir("MyEpisode")),
        vec![
            "graphics/tiles.png",
            "level1.wld",
            "level3.wld",
            "progress.json",
            "save1.sav",
            "world.wwx"
        ]
    );
    assert_eq!(state.version, VersionToken::ETag("\"v2\"".to_string()));
    assert_cache_clean(&env);
}

#[tokio::test]
async fn test_backup_restores_previous_version() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = updater(&env, &host.url());
    run(&updater, &UpdateOptions::default()).await.unwrap();
    env.write_installed("MyEpisode", "save1.sav", "player save").unwrap();

    host.publish(v2_archive().to_bytes(), "\"v2\"").await;
    let (report, _) = expect_updated(run(&updater, &UpdateOptions::default()).await.unwrap());

    let backups = updater.backups();
    let handle = backups.load(report.backup_id.as_deref().unwrap()).unwrap();
    backups.restore(&handle).unwrap();

    assert_eq!(env.read_installed("MyEpisode", "level1.wld").unwrap(), "level one v1");
    assert_eq!(env.read_installed("MyEpisode", "level2.wld").unwrap(), "level two v1");
    assert!(!env.install_dir("MyEpisode").join("level3.wld").exists());
    assert_eq!(env.read_installed("MyEpisode", "save1.sav").unwrap(), "player save");
}

#[tokio::test]
async fn test_second_run_is_up_to_date() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = updater(&env, &host.url());
    run(&updater, &UpdateOptions::default()).await.unwrap();
    let gets_after_install = host.archive_gets().await;

    let outcome = run(&updater, &UpdateOptions::default()).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }), "got {outcome:?}");

    // Only the probe reached the server; the archive was not downloaded again
    assert_eq!(host.archive_gets().await, gets_after_install + 1);

    let check = updater.check().await.unwrap();
    assert_eq!(check.update_available, Some(false));
}

#[tokio::test]
async fn test_unversioned_server_compares_content_hash() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    let bytes = ZipFixture::episode("MyEpisode").to_bytes();
    host.publish_unversioned(bytes.clone()).await;
    let updater = updater(&env, &host.url());

    let (_, state) = expect_updated(run(&updater, &UpdateOptions::default()).await.unwrap());
    assert!(state.version.is_content_hash());

    assert_eq!(updater.check().await.unwrap().update_available, None);

    let outcome = run(&updater, &UpdateOptions::default()).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }), "got {outcome:?}");

    host.publish_unversioned(v2_archive().to_bytes()).await;
    let (report, _) = expect_updated(run(&updater, &UpdateOptions::default()).await.unwrap());
    assert_eq!(report.created, vec!["level3.wld", "save1.sav"]);
}

#[tokio::test]
async fn test_force_resyncs_without_changes() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = updater(&env, &host.url());
    run(&updater, &UpdateOptions::default()).await.unwrap();

    let options = UpdateOptions {
        force: true,
        install_name: None,
    };
    let (report, _) = expect_updated(run(&updater, &options).await.unwrap());
    assert_eq!(report.changed(), 0);
    assert_eq!(report.unchanged, 4);
    assert_eq!(report.backup_id, None, "a no-op merge takes no backup");
}

#[tokio::test]
async fn test_unrecorded_state_keeps_files_and_resyncs() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = updater(&env, &host.url());
    let (_, v1_state) = expect_updated(run(&updater, &UpdateOptions::default()).await.unwrap());
    let state_file = env.paths().state_file();
    let recorded = std::fs::read(&state_file).unwrap();

    // Occupy the state file's temporary sibling so the commit cannot write
    let blocker = temp_sibling(&state_file);
    std::fs::create_dir_all(blocker.join("occupied")).unwrap();

    host.publish(v2_archive().to_bytes(), "\"v2\"").await;
    let err = run(&updater, &UpdateOptions::default()).await.unwrap_err();

    assert!(matches!(err, SyncError::PersistFailed { .. }), "got {err:?}");
    assert!(err.is_inconsistent_state());
    assert_eq!(err.exit_code(), 7);
    assert_eq!(env.read_installed("MyEpisode", "level1.wld").unwrap(), "level one v2");
    assert!(env.install_dir("MyEpisode").join("level3.wld").is_file());
    assert_eq!(std::fs::read(&state_file).unwrap(), recorded);
    assert_eq!(updater.state_store().load(), Some(v1_state));
    assert_cache_clean(&env);

    std::fs::remove_dir_all(&blocker).unwrap();
    let (report, state) = expect_updated(run(&updater, &UpdateOptions::default()).await.unwrap());
    assert_eq!(report.changed(), 0, "files were already merged");
    assert_eq!(state.version, VersionToken::ETag("\"v2\"".to_string()));
    assert_eq!(updater.state_store().load(), Some(state));
}

#[tokio::test]
async fn test_deleted_install_is_reinstalled() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = updater(&env, &host.url());
    run(&updater, &UpdateOptions::default()).await.unwrap();

    std::fs::remove_dir_all(env.install_dir("MyEpisode")).unwrap();
    let (report, _) = expect_updated(run(&updater, &UpdateOptions::default()).await.unwrap());
    assert!(report.fresh_install);
    assert!(env.install_dir("MyEpisode").join("level1.wld").is_file());
}

#[tokio::test]
async fn test_install_name_override() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    let updater = updater(&env, &host.url());

    let options = UpdateOptions {
        force: false,
        install_name: Some("My Custom Name".to_string()),
    };
    let (_, state) = expect_updated(run(&updater, &options).await.unwrap());
    assert_eq!(state.episode_name, "My Custom Name");
    assert!(env.install_dir("My Custom Name").join("level1.wld").is_file());
    assert!(!env.install_dir("MyEpisode").exists());

    let bad = UpdateOptions {
        force: false,
        install_name: Some("../outside".to_string()),
    };
    let err = run(&updater, &bad).await.unwrap_err();
    assert!(matches!(err, SyncError::Config { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_top_level_archive_uses_archive_name() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    let archive = ZipFixture::new().file("level1.wld", "top level").file("gfx/a.png", "png");
    host.publish(archive.to_bytes(), "\"v1\"").await;

    let (_, state) =
        expect_updated(run(&updater(&env, &host.url()), &UpdateOptions::default()).await.unwrap());
    assert_eq!(state.episode_name, "MyEpisode");
    assert_eq!(env.read_installed("MyEpisode", "level1.wld").unwrap(), "top level");
}

#[tokio::test]
async fn test_dot_archive_name_never_targets_episodes_dir() {
    let env = TestEnvironment::new().unwrap();
    env.write_installed("OtherEpisode", "level1.wld", "someone else's episode").unwrap();

    let host = EpisodeHost::start().await;
    let archive = ZipFixture::new().file("level1.wld", "top level");
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(
            zip_response(archive.to_bytes())
                .insert_header("ETag", "\"v1\"")
                .insert_header("Content-Disposition", "attachment; filename=\"..zip\""),
        )
        .mount(&host.server)
        .await;

    let (report, state) =
        expect_updated(run(&updater(&env, &host.url()), &UpdateOptions::default()).await.unwrap());

    assert_eq!(state.episode_name, "episode");
    assert_eq!(state.install_dir, env.install_dir("episode"));
    assert!(report.deleted.is_empty(), "deleted {:?}", report.deleted);
    assert_eq!(
        env.read_installed("OtherEpisode", "level1.wld").unwrap(),
        "someone else's episode"
    );
    assert_eq!(
        list_files(&env.episodes_dir),
        vec!["OtherEpisode/level1.wld", "episode/level1.wld"]
    );
}

#[tokio::test]
async fn test_traversal_archive_changes_nothing() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    let archive = ZipFixture::episode("MyEpisode").file("../../escape.txt", "pwned");
    host.publish(archive.to_bytes(), "\"v1\"").await;

    let updater = updater(&env, &host.url());
    let err = run(&updater, &UpdateOptions::default()).await.unwrap_err();

    assert!(matches!(err, SyncError::UnsafeArchiveEntry { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 4);
    assert!(!env.install_dir("MyEpisode").exists());
    assert!(list_files(env.path()).iter().all(|f| !f.ends_with("escape.txt")));
    assert_eq!(updater.state_store().load(), None);
    assert_cache_clean(&env);
}

#[tokio::test]
async fn test_archive_without_levels_is_rejected() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    let archive = ZipFixture::new().file("readme.txt", "hello").file("gfx/a.png", "png");
    host.publish(archive.to_bytes(), "\"v1\"").await;

    let updater = updater(&env, &host.url());
    let err = run(&updater, &UpdateOptions::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::NoEpisodeRootFound { .. }), "got {err:?}");
    assert_eq!(updater.state_store().load(), None);
}

#[tokio::test]
async fn test_html_download_page_is_rejected() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish_html().await;

    let updater = updater(&env, &host.url());
    let err = run(&updater, &UpdateOptions::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::NotAnArchive { .. }), "got {err:?}");
    assert!(!err.is_retryable());
    assert!(list_files(&env.episodes_dir).is_empty());
    assert_cache_clean(&env);
}

#[tokio::test]
async fn test_missing_archive_is_fetch_failed() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;

    let err = run(&updater(&env, &host.url()), &UpdateOptions::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::FetchFailed { .. }), "got {err:?}");
}
