//! Artifact fetcher behavior against a live HTTP server.

use crate::common::{ARCHIVE_PATH, EpisodeHost, RecordingProgress, zip_response};
use epsync::config::RetryPolicy;
use epsync::core::{CancelToken, NoopProgress, SyncError};
use epsync::remote::{ArtifactFetcher, VersionToken, http_client, resolve_remote_version};
use epsync::test_utils::ZipFixture;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    }
}

fn fetcher(max_attempts: u32) -> ArtifactFetcher {
    let client = http_client(Duration::from_secs(5)).unwrap();
    ArtifactFetcher::new(client, fast_retry(max_attempts))
}

/// Serves `body` over plain HTTP/1.1 in `chunks` pieces, sleeping `gap`
/// before each one. Returns the archive URL.
async fn serve_slowly(body: Vec<u8>, chunks: usize, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for piece in body.chunks(body.len().div_ceil(chunks)) {
                    tokio::time::sleep(gap).await;
                    if socket.write_all(piece).await.is_err() || socket.flush().await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    format!("http://{addr}{ARCHIVE_PATH}")
}

#[tokio::test]
async fn test_fetch_downloads_and_hashes() {
    let host = EpisodeHost::start().await;
    let bytes = ZipFixture::episode("MyEpisode").to_bytes();
    host.publish(bytes.clone(), "\"v1\"").await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("download").join("archive.zip");
    let progress = RecordingProgress::default();

    let result =
        fetcher(3).fetch(&host.url(), &dest, &progress, &CancelToken::new()).await.unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), bytes);
    assert_eq!(result.bytes, bytes.len() as u64);
    assert_eq!(result.sha256, epsync::utils::fs::calculate_checksum(&dest).unwrap());
    assert_eq!(result.file_name, "MyEpisode.zip");
    assert_eq!(result.version, Some(VersionToken::ETag("\"v1\"".to_string())));

    let transfers = progress.transfers.lock().unwrap();
    assert!(!transfers.is_empty());
    assert!(
        transfers.windows(2).all(|w| w[0].bytes_transferred < w[1].bytes_transferred),
        "progress must never go backwards"
    );
    assert_eq!(transfers.last().unwrap().bytes_transferred, bytes.len() as u64);
}

#[tokio::test]
async fn test_fetch_retries_transient_failures() {
    let host = EpisodeHost::start().await;
    let bytes = ZipFixture::episode("MyEpisode").to_bytes();

    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&host.server)
        .await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(zip_response(bytes.clone()))
        .mount(&host.server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("archive.zip");
    let result =
        fetcher(3).fetch(&host.url(), &dest, &NoopProgress, &CancelToken::new()).await.unwrap();

    assert_eq!(result.bytes, bytes.len() as u64);
    assert_eq!(host.archive_gets().await, 3);
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_attempts() {
    let host = EpisodeHost::start().await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&host.server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("archive.zip");
    let err = fetcher(2)
        .fetch(&host.url(), &dest, &NoopProgress, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    match err {
        SyncError::FetchFailed {
            attempts,
            ..
        } => assert_eq!(attempts, 2),
        other => panic!("expected FetchFailed, got {other:?}"),
    }
    assert_eq!(host.archive_gets().await, 2);
    assert!(!dest.exists());
    assert!(!temp.path().join("archive.zip.part").exists());
}

#[tokio::test]
async fn test_slow_download_outlasting_timeout_completes() {
    let bytes = ZipFixture::episode("MyEpisode").to_bytes();
    let url = serve_slowly(bytes.clone(), 5, Duration::from_millis(200)).await;
    let client = http_client(Duration::from_millis(600)).unwrap();

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("archive.zip");
    let started = Instant::now();
    let result = ArtifactFetcher::new(client, fast_retry(1))
        .fetch(&url, &dest, &NoopProgress, &CancelToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() > Duration::from_millis(600), "body took longer than the timeout");
    assert_eq!(result.bytes, bytes.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), bytes);
}

#[tokio::test]
async fn test_stalled_download_times_out() {
    let bytes = ZipFixture::episode("MyEpisode").to_bytes();
    let url = serve_slowly(bytes, 2, Duration::from_secs(5)).await;
    let client = http_client(Duration::from_millis(300)).unwrap();

    let temp = TempDir::new().unwrap();
    let err = ArtifactFetcher::new(client, fast_retry(2))
        .fetch(&url, &temp.path().join("archive.zip"), &NoopProgress, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(matches!(err, SyncError::FetchFailed { attempts: 2, .. }), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_does_not_retry_not_found() {
    let host = EpisodeHost::start().await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&host.server)
        .await;

    let temp = TempDir::new().unwrap();
    let err = fetcher(3)
        .fetch(&host.url(), &temp.path().join("archive.zip"), &NoopProgress, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::FetchFailed { attempts: 1, .. }), "got {err:?}");
    assert_eq!(host.archive_gets().await, 1);
}

#[tokio::test]
async fn test_fetch_rejects_html_page() {
    let host = EpisodeHost::start().await;
    host.publish_html().await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("archive.zip");
    let err = fetcher(3)
        .fetch(&host.url(), &dest, &NoopProgress, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::NotAnArchive { .. }), "got {err:?}");
    // Not retried: the server answered, just with the wrong thing
    assert_eq!(host.archive_gets().await, 1);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_fetch_honors_cancellation() {
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;

    let cancel = CancelToken::new();
    cancel.cancel();

    let temp = TempDir::new().unwrap();
    let err = fetcher(3)
        .fetch(&host.url(), &temp.path().join("archive.zip"), &NoopProgress, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));
    assert_eq!(host.archive_gets().await, 0);
}

#[tokio::test]
async fn test_probe_reads_version_and_name() {
    let host = EpisodeHost::start().await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(
            zip_response(ZipFixture::episode("MyEpisode").to_bytes())
                .insert_header("Last-Modified", "Tue, 01 Sep 2026 10:00:00 GMT")
                .insert_header("Content-Disposition", "attachment; filename=\"Episode v2.zip\""),
        )
        .mount(&host.server)
        .await;

    let client = http_client(Duration::from_secs(5)).unwrap();
    let probe = resolve_remote_version(&client, &host.url()).await.unwrap();

    assert_eq!(
        probe.version,
        Some(VersionToken::LastModified("Tue, 01 Sep 2026 10:00:00 GMT".to_string()))
    );
    assert_eq!(probe.file_name, "Episode v2.zip");
    assert!(probe.content_length.is_some());
}

#[tokio::test]
async fn test_probe_server_error_is_unavailable() {
    let host = EpisodeHost::start().await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&host.server)
        .await;

    let client = http_client(Duration::from_secs(5)).unwrap();
    let err = resolve_remote_version(&client, &host.url()).await.unwrap_err();
    assert!(matches!(err, SyncError::RemoteUnavailable { .. }), "got {err:?}");
    assert!(err.is_retryable());
}
