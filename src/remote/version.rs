//! Remote version identity.
//!
//! A [`VersionToken`] names one revision of the remote archive. Tokens are
//! opaque: two tokens are either equal (nothing to do) or different (sync),
//! never ordered. Header identity is preferred because it needs no download;
//! the content hash is the fallback for servers that send neither `ETag` nor
//! `Last-Modified`.

use reqwest::header::{ETAG, HeaderMap, LAST_MODIFIED};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a remote archive revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionToken {
    /// `ETag` header value, quotes and weak prefix included
    ETag(String),
    /// `Last-Modified` header value
    LastModified(String),
    /// SHA-256 of the downloaded archive
    ContentHash(String),
}

impl VersionToken {
    /// Picks the version identity from response headers, preferring `ETag`.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        header(ETAG).map(Self::ETag).or_else(|| header(LAST_MODIFIED).map(Self::LastModified))
    }

    /// Whether the token was derived from the archive bytes.
    pub const fn is_content_hash(&self) -> bool {
        matches!(self, Self::ContentHash(_))
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ETag(v) => write!(f, "etag:{v}"),
            Self::LastModified(v) => write!(f, "last-modified:{v}"),
            Self::ContentHash(v) => write!(f, "sha256:{v}"),
        }
    }
}

impl FromStr for VersionToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) =
            s.split_once(':').ok_or_else(|| format!("version token has no kind prefix: {s}"))?;
        let value = value.to_string();
        match kind {
            "etag" => Ok(Self::ETag(value)),
            "last-modified" => Ok(Self::LastModified(value)),
            "sha256" => Ok(Self::ContentHash(value)),
            other => Err(format!("unknown version token kind '{other}'")),
        }
    }
}

impl Serialize for VersionToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether `remote` differs from the recorded `current` token.
///
/// No recorded token always means an update is available.
pub fn is_update_available(current: Option<&VersionToken>, remote: &VersionToken) -> bool {
    current != Some(remote)
}
