//! File digests and filesystem probes.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Size and SHA-256 of a file's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Length in bytes
    pub size: u64,
    /// Lowercase hex SHA-256
    pub sha256: String,
}

/// Streams a file through SHA-256.
///
/// The file is never loaded into memory whole, so this is safe for large
/// world files and downloaded archives.
pub fn file_digest(path: &Path) -> io::Result<FileDigest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher)?;
    Ok(FileDigest {
        size,
        sha256: hex::encode(hasher.finalize()),
    })
}

/// Calculates the SHA-256 checksum of a file as lowercase hex.
pub fn calculate_checksum(path: &Path) -> io::Result<String> {
    file_digest(path).map(|d| d.sha256)
}

/// Reports whether the filesystem holding `dir` ignores letter case.
///
/// Creates a uniquely named lowercase probe file in `dir` and checks whether
/// its uppercased name resolves to the same file.
pub fn probe_case_insensitive(dir: &Path) -> io::Result<bool> {
    fs::create_dir_all(dir)?;
    let probe = tempfile::Builder::new().prefix(".epsync-case-probe-").tempfile_in(dir)?;

    let name = probe
        .path()
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::other("probe file name is not UTF-8"))?;
    let upper = name.to_uppercase();
    if upper == name {
        // Random suffix had no letters to fold; treat as sensitive.
        return Ok(false);
    }

    Ok(dir.join(upper).exists())
}
