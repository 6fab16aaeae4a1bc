//! Talking to the server that hosts the episode archive.
//!
//! - [`probe`]: `HEAD`-first metadata probe producing a [`RemoteProbe`]
//! - [`fetch`]: streaming download with retries and archive sniffing
//! - [`version`]: the [`VersionToken`] identity and the update decision

pub mod fetch;
pub mod probe;
pub mod version;

pub use fetch::{ArtifactFetcher, FetchResult};
pub use probe::{RemoteProbe, resolve_remote_version};
pub use version::{VersionToken, is_update_available};

use crate::constants::{FALLBACK_ARCHIVE_NAME, HTTP_CONNECT_TIMEOUT, USER_AGENT};
use crate::core::{SyncError, SyncResult};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static FILENAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).ok());

/// Builds the HTTP client shared by probing and fetching.
///
/// `read_timeout` bounds each wait for the server (response headers or the
/// next body chunk) rather than the whole request, so a large archive can
/// take as long as it needs while bytes keep arriving. Redirects are followed
/// (reqwest's default policy).
pub fn http_client(read_timeout: Duration) -> SyncResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .read_timeout(read_timeout)
        .build()
        .map_err(|e| SyncError::config(format!("Failed to build HTTP client: {e}")))
}

/// Name the server gives the archive.
///
/// `Content-Disposition` wins (`filename*=` or `filename=`), then the last
/// segment of the final URL path, then `episode.zip`.
pub fn server_file_name(headers: &HeaderMap, url: &reqwest::Url) -> String {
    let from_header = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(|cd| FILENAME_RE.as_ref()?.captures(cd))
        .and_then(|caps| caps.get(1))
        .and_then(|m| Path::new(m.as_str().trim()).file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    from_header
        .or_else(|| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_ARCHIVE_NAME.to_string())
}

/// HTTP statuses worth retrying: server errors, request timeout, rate limit.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}
