//! Deskhelper Common - shared types for the desktop helper daemon
//!
//! Versions, the update manifest, the on-disk version marker,
//! configuration and the update error taxonomy.

pub mod config;
pub mod error;
pub mod manifest;
pub mod marker;
pub mod version;

pub use config::{Config, ConfigError, ServerConfig, SwapStrategy, UpdateConfig, VersionSourceKind};
pub use error::UpdateError;
pub use manifest::{ManifestCheck, ManifestPayload, UpdateManifest};
pub use marker::{VersionMarker, VersionSource};
pub use version::{is_update_available, ParseVersionError, Version};
