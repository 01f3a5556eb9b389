//! Error types for the update checker.

use crate::version::ParseVersionError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("update server returned HTTP {status}")]
    ManifestStatus { status: u16 },

    #[error("download from {url} returned HTTP {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("malformed update manifest: {0}")]
    MalformedManifest(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidVersion(#[from] ParseVersionError),

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UpdateError {
    /// Classify a reqwest failure by what went wrong on the wire
    pub fn transport(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_string();
        // Connect timeouts report both; the timeout is the more specific fact
        if source.is_timeout() {
            UpdateError::Timeout { url, source }
        } else if source.is_connect() {
            UpdateError::Connect { url, source }
        } else {
            UpdateError::Transport { url, source }
        }
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        UpdateError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Short stable name, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateError::Connect { .. } => "connect",
            UpdateError::Timeout { .. } => "timeout",
            UpdateError::Transport { .. } => "transport",
            UpdateError::ManifestStatus { .. } => "manifest_status",
            UpdateError::DownloadStatus { .. } => "download_status",
            UpdateError::MalformedManifest(_) => "malformed_manifest",
            UpdateError::InvalidVersion(_) => "invalid_version",
            UpdateError::Io { .. } => "io",
            UpdateError::Spawn { .. } => "spawn",
        }
    }
}
