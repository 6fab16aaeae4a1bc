//! Streaming archive download.
//!
//! The body is streamed chunk by chunk into `<destination>.part`, hashed on the
//! way through, and renamed to `destination` only after it is complete and
//! synced. The first four bytes are sniffed for a ZIP signature so an HTML
//! error page served with `200 OK` fails fast instead of reaching the
//! extractor.
//!
//! # Retries
//!
//! Connect errors, timeouts, interrupted bodies and HTTP 5xx/408/429 are
//! retried with exponential backoff up to the configured attempt count. Any
//! other 4xx, a non-ZIP payload, local I/O failure or cancellation stops
//! immediately.

use super::version::VersionToken;
use super::{is_transient_status, server_file_name};
use crate::config::RetryPolicy;
use crate::core::{CancelToken, ProgressSink, SyncError, SyncResult, TransferProgress};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tokio_retry::RetryIf;
use tracing::{debug, info, warn};

/// Local file signatures, end of central directory (empty archive), and
/// spanned archive marker.
const ZIP_SIGNATURES: [[u8; 4]; 3] = [*b"PK\x03\x04", *b"PK\x05\x06", *b"PK\x07\x08"];

/// A completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Final location of the archive
    pub path: PathBuf,
    /// Bytes written
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the archive
    pub sha256: String,
    /// Archive name as served
    pub file_name: String,
    /// Version headers of the response that delivered the bytes
    pub version: Option<VersionToken>,
}

impl FetchResult {
    /// Header version when present, else the content hash.
    pub fn version_token(&self) -> VersionToken {
        self.version.clone().unwrap_or_else(|| VersionToken::ContentHash(self.sha256.clone()))
    }
}

/// Outcome of a single attempt that did not succeed.
#[derive(Debug)]
enum AttemptError {
    /// Worth another attempt
    Transient(String),
    /// Stop now
    Fatal(SyncError),
}

/// Downloads the episode archive with retries.
pub struct ArtifactFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl ArtifactFetcher {
    pub const fn new(client: Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
        }
    }

    /// Downloads `url` to `destination`.
    ///
    /// Byte counts reported to `progress` never decrease, even across retries.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotAnArchive`] when the payload is not a ZIP
    /// - [`SyncError::FetchFailed`] after exhausting attempts or on a
    ///   non-transient HTTP status
    /// - [`SyncError::Cancelled`] when `cancel` trips between chunks
    /// - [`SyncError::Io`] when the staging file cannot be written
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> SyncResult<FetchResult> {
        let part_path = part_path(destination);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io("create download directory", parent, e))?;
        }

        let attempts = AtomicU32::new(0);
        let high_water = AtomicU64::new(0);

        let part = part_path.as_path();
        let (attempts_ref, high_water_ref) = (&attempts, &high_water);

        let outcome = RetryIf::spawn(
            self.retry.schedule(),
            move || {
                let attempt = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
                self.attempt(url, part, attempt, progress, cancel, high_water_ref)
            },
            |e: &AttemptError| match e {
                AttemptError::Transient(reason) => {
                    if cancel.is_cancelled() {
                        return false;
                    }
                    warn!(
                        url = %url,
                        attempt = attempts.load(Ordering::SeqCst),
                        reason = %reason,
                        "Download attempt failed; retrying"
                    );
                    true
                }
                AttemptError::Fatal(_) => false,
            },
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(match e {
                    AttemptError::Fatal(error) => error,
                    AttemptError::Transient(_) if cancel.is_cancelled() => SyncError::Cancelled,
                    AttemptError::Transient(reason) => SyncError::FetchFailed {
                        url: url.to_string(),
                        attempts: attempts.load(Ordering::SeqCst),
                        reason,
                    },
                });
            }
        };

        if let Err(e) = tokio::fs::rename(&part_path, destination).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(SyncError::io("move downloaded archive to", destination, e));
        }

        progress.on_phase_end();
        info!(
            url = %url,
            bytes = result.bytes,
            sha256 = %result.sha256,
            "Downloaded {}",
            result.file_name
        );
        Ok(FetchResult {
            path: destination.to_path_buf(),
            ..result
        })
    }

    async fn attempt(
        &self,
        url: &str,
        part_path: &Path,
        attempt: u32,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
        high_water: &AtomicU64,
    ) -> Result<FetchResult, AttemptError> {
        cancel.checkpoint().map_err(AttemptError::Fatal)?;
        debug!(url = %url, attempt, "Starting download");

        let mut response = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                AttemptError::Fatal(SyncError::FetchFailed {
                    url: url.to_string(),
                    attempts: attempt,
                    reason: e.to_string(),
                })
            } else {
                AttemptError::Transient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let reason = format!("HTTP {status}");
            return Err(if is_transient_status(status) {
                AttemptError::Transient(reason)
            } else {
                AttemptError::Fatal(SyncError::FetchFailed {
                    url: url.to_string(),
                    attempts: attempt,
                    reason,
                })
            });
        }

        let headers = response.headers();
        let version = VersionToken::from_headers(headers);
        let file_name = server_file_name(headers, response.url());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let total_bytes = response.content_length();

        let io_error = |e| AttemptError::Fatal(SyncError::io("write downloaded archive", part_path, e));
        let mut file = tokio::fs::File::create(part_path).await.map_err(io_error)?;
        let mut hasher = Sha256::new();
        let mut head: Vec<u8> = Vec::with_capacity(4);
        let mut sniffed = false;
        let mut bytes: u64 = 0;

        while let Some(chunk) =
            response.chunk().await.map_err(|e| AttemptError::Transient(e.to_string()))?
        {
            if !sniffed {
                let take = (4 - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
                if head.len() == 4 {
                    check_signature(url, &head, &content_type).map_err(AttemptError::Fatal)?;
                    sniffed = true;
                }
            }

            file.write_all(&chunk).await.map_err(io_error)?;
            hasher.update(&chunk);
            bytes += chunk.len() as u64;

            if bytes > high_water.load(Ordering::SeqCst) {
                high_water.store(bytes, Ordering::SeqCst);
                progress.on_transfer(TransferProgress {
                    bytes_transferred: bytes,
                    total_bytes,
                });
            }

            cancel.checkpoint().map_err(AttemptError::Fatal)?;
        }

        if !sniffed {
            check_signature(url, &head, &content_type).map_err(AttemptError::Fatal)?;
        }

        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        drop(file);

        Ok(FetchResult {
            path: part_path.to_path_buf(),
            bytes,
            sha256: hex::encode(hasher.finalize()),
            file_name,
            version,
        })
    }
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

/// Rejects payloads that do not start with a ZIP signature.
fn check_signature(url: &str, head: &[u8], content_type: &str) -> SyncResult<()> {
    if head.len() == 4 && ZIP_SIGNATURES.iter().any(|sig| sig.as_slice() == head) {
        return Ok(());
    }

    let looks_like_html = content_type.contains("html") || head.first() == Some(&b'<');
    let detail = if head.is_empty() {
        format!("empty response (content type: {content_type})")
    } else if looks_like_html {
        format!("received an HTML page (content type: {content_type}); use a direct download link")
    } else {
        format!("unexpected leading bytes {} (content type: {content_type})", hex::encode(head))
    };

    Err(SyncError::NotAnArchive {
        url: url.to_string(),
        detail,
    })
}
