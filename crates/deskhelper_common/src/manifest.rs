//! Update manifest served by the update server.
//!
//! Wire format: `{"version": "1.2.0", "download_url": "https://..."}`.
//! A payload missing either field is not an error, it means there is
//! nothing to install right now.

use crate::error::UpdateError;
use crate::version::{ParseVersionError, Version};
use serde::Deserialize;

/// Raw manifest body, fields as the server sent them
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestPayload {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub download_url: Option<String>,
}

/// A complete manifest: both fields present and the version parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateManifest {
    pub version: Version,
    pub download_url: String,
}

/// Result of reading a manifest body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestCheck {
    Complete(UpdateManifest),
    Incomplete { missing: Vec<&'static str> },
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ManifestPayload {
    /// Names of required fields that are absent, null or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if present(&self.version).is_none() {
            missing.push("version");
        }
        if present(&self.download_url).is_none() {
            missing.push("download_url");
        }
        missing
    }

    pub fn check(&self) -> Result<ManifestCheck, ParseVersionError> {
        match (present(&self.version), present(&self.download_url)) {
            (Some(version), Some(url)) => Ok(ManifestCheck::Complete(UpdateManifest {
                version: Version::parse(version)?,
                download_url: url.to_string(),
            })),
            _ => Ok(ManifestCheck::Incomplete {
                missing: self.missing_fields(),
            }),
        }
    }
}

impl UpdateManifest {
    /// Parse a manifest response body
    pub fn from_json(body: &[u8]) -> Result<ManifestCheck, UpdateError> {
        let payload: ManifestPayload = serde_json::from_slice(body)?;
        Ok(payload.check()?)
    }
}
