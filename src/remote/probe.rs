//! Lightweight metadata probe.

use super::version::VersionToken;
use super::{is_transient_status, server_file_name};
use crate::core::{SyncError, SyncResult};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Response};
use tracing::debug;

/// What the server says about the archive without sending its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProbe {
    /// URL after redirects
    pub final_url: String,
    /// Header-derived version, `None` when the server sends neither `ETag`
    /// nor `Last-Modified`
    pub version: Option<VersionToken>,
    /// Archive name as served
    pub file_name: String,
    /// Announced size in bytes
    pub content_length: Option<u64>,
}

/// Probes `url` with `HEAD`, falling back to a `GET` whose body is dropped
/// when `HEAD` is rejected or omits the size.
///
/// # Errors
///
/// [`SyncError::RemoteUnavailable`] for network failures and server errors,
/// [`SyncError::FetchFailed`] for other non-success statuses.
pub async fn resolve_remote_version(client: &Client, url: &str) -> SyncResult<RemoteProbe> {
    let head = client.head(url).send().await.map_err(|e| unavailable(url, &e))?;

    let response = if head.status().is_success() && has_content_length(&head) {
        head
    } else {
        debug!("HEAD {} answered {}; probing with GET", url, head.status());
        client.get(url).send().await.map_err(|e| unavailable(url, &e))?
    };

    let status = response.status();
    if !status.is_success() {
        return Err(if is_transient_status(status) {
            SyncError::RemoteUnavailable {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            }
        } else {
            SyncError::FetchFailed {
                url: url.to_string(),
                attempts: 1,
                reason: format!("HTTP {status}"),
            }
        });
    }

    let headers = response.headers();
    let probe = RemoteProbe {
        final_url: response.url().to_string(),
        version: VersionToken::from_headers(headers),
        file_name: server_file_name(headers, response.url()),
        content_length: headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok()),
    };
    debug!(
        url = %url,
        version = ?probe.version,
        size = ?probe.content_length,
        "Probed remote archive"
    );
    Ok(probe)
}

fn has_content_length(response: &Response) -> bool {
    response.headers().contains_key(CONTENT_LENGTH)
}

fn unavailable(url: &str, error: &reqwest::Error) -> SyncError {
    SyncError::RemoteUnavailable {
        url: url.to_string(),
        reason: error.to_string(),
    }
}
