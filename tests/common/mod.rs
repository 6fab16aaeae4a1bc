//! Common helpers for epsync integration tests
//!
//! Wraps a wiremock server that publishes episode archives the way a file
//! host would, plus small assertions shared by the scenarios.

// Not every scenario uses every helper
#![allow(dead_code)]

use epsync::core::{ProgressSink, TransferProgress};
use std::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the test server publishes the archive under.
pub const ARCHIVE_PATH: &str = "/files/MyEpisode.zip";

/// A wiremock server publishing one archive.
pub struct EpisodeHost {
    pub server: MockServer,
}

impl EpisodeHost {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), ARCHIVE_PATH)
    }

    /// Serves `bytes` with an `ETag`. Replaces anything published before.
    pub async fn publish(&self, bytes: Vec<u8>, etag: &str) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(zip_response(bytes).insert_header("ETag", etag))
            .mount(&self.server)
            .await;
    }

    /// Serves `bytes` without any version headers.
    pub async fn publish_unversioned(&self, bytes: Vec<u8>) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(zip_response(bytes))
            .mount(&self.server)
            .await;
    }

    /// Serves a download page instead of the archive.
    pub async fn publish_html(&self) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/html; charset=utf-8")
                    .set_body_string("<!DOCTYPE html><html><body>Click to download</body></html>"),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of GET requests the server has seen for the archive.
    pub async fn archive_gets(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "GET" && r.url.path() == ARCHIVE_PATH)
            .count()
    }
}

pub fn zip_response(bytes: Vec<u8>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "application/zip")
        .set_body_bytes(bytes)
}

/// Progress sink recording every event.
#[derive(Default)]
pub struct RecordingProgress {
    pub transfers: Mutex<Vec<TransferProgress>>,
    pub applied: Mutex<Vec<(usize, usize)>>,
}

impl ProgressSink for RecordingProgress {
    fn on_transfer(&self, progress: TransferProgress) {
        self.transfers.lock().unwrap().push(progress);
    }

    fn on_apply(&self, done: usize, total: usize) {
        self.applied.lock().unwrap().push((done, total));
    }
}

/// Relative paths of every file under `root`, sorted, `/`-separated.
pub fn list_files(root: &std::path::Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}
