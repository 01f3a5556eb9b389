//! Installed-version marker.
//!
//! A one-line text file holding the version of the binary that is
//! currently installed. It is read at the start of every update cycle and
//! overwritten once a new binary has been downloaded.

use crate::config::{UpdateConfig, VersionSourceKind};
use crate::error::UpdateError;
use crate::version::Version;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct VersionMarker {
    path: PathBuf,
    baseline: Version,
}

impl VersionMarker {
    pub fn new(path: impl Into<PathBuf>, baseline: Version) -> Self {
        Self {
            path: path.into(),
            baseline,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the installed version. A missing or empty marker yields the baseline.
    pub fn load(&self) -> Result<Version, UpdateError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    path = %self.path.display(),
                    "Version marker not found, assuming {}",
                    self.baseline
                );
                return Ok(self.baseline.clone());
            }
            Err(e) => return Err(UpdateError::io("read", &self.path, e)),
        };

        if content.trim().is_empty() {
            warn!(
                path = %self.path.display(),
                "Version marker is empty, assuming {}",
                self.baseline
            );
            return Ok(self.baseline.clone());
        }

        Ok(Version::parse(&content)?)
    }

    /// Overwrite the marker with `version`
    pub fn save(&self, version: &Version) -> Result<(), UpdateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| UpdateError::io("create", parent, e))?;
        }
        fs::write(&self.path, version.to_string())
            .map_err(|e| UpdateError::io("write", &self.path, e))?;
        info!(path = %self.path.display(), "Version marker updated to {}", version);
        Ok(())
    }
}

/// Where the current version comes from
#[derive(Debug, Clone)]
pub enum VersionSource {
    /// Persisted marker file, advanced by each applied update
    Marker(VersionMarker),
    /// Fixed version compiled into the binary
    Builtin(Version),
}

impl VersionSource {
    /// Build the source selected in config. `builtin` is the running
    /// binary's own package version.
    pub fn from_config(config: &UpdateConfig, builtin: &str) -> Result<Self, UpdateError> {
        match config.version_source {
            VersionSourceKind::Marker => Ok(VersionSource::Marker(VersionMarker::new(
                &config.marker_path,
                Version::parse(&config.baseline_version)?,
            ))),
            VersionSourceKind::Builtin => Ok(VersionSource::Builtin(Version::parse(builtin)?)),
        }
    }

    pub fn current(&self) -> Result<Version, UpdateError> {
        match self {
            VersionSource::Marker(marker) => marker.load(),
            VersionSource::Builtin(version) => Ok(version.clone()),
        }
    }

    /// Persist a newly installed version. Builtin versions have nowhere to go.
    pub fn record(&self, version: &Version) -> Result<(), UpdateError> {
        match self {
            VersionSource::Marker(marker) => marker.save(version),
            VersionSource::Builtin(_) => Ok(()),
        }
    }
}
