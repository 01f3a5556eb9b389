//! Staging paths and the executable swap.

use deskhelper_common::{SwapStrategy, UpdateError, Version};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the new binary goes and how it takes over
#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub executable: PathBuf,
    pub staging_dir: PathBuf,
    pub backup_suffix: String,
    pub strategy: SwapStrategy,
}

impl SwapPlan {
    /// `<exe>.<suffix>`, e.g. `deskhelperd.exe.old`
    pub fn backup_path(&self) -> PathBuf {
        let mut name: OsString = self.executable.as_os_str().to_owned();
        name.push(".");
        name.push(&self.backup_suffix);
        PathBuf::from(name)
    }

    /// `<staging>/<stem>_v<version>[.<ext>]`, never the executable's own path
    pub fn staged_path(&self, version: &Version) -> PathBuf {
        let stem = self
            .executable
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "deskhelperd".to_string());
        let mut name = format!("{}_v{}", stem, version);
        if let Some(ext) = self.executable.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        self.staging_dir.join(name)
    }

    /// Put the staged binary into service; returns the path to launch
    pub fn install(&self, staged: &Path) -> Result<PathBuf, UpdateError> {
        match self.strategy {
            SwapStrategy::LaunchStaged => {
                info!("Launching staged binary in place: {}", staged.display());
                Ok(staged.to_path_buf())
            }
            SwapStrategy::Replace => self.replace(staged),
        }
    }

    fn replace(&self, staged: &Path) -> Result<PathBuf, UpdateError> {
        let backup = self.backup_path();

        fs::rename(&self.executable, &backup)
            .map_err(|e| UpdateError::io("back up", &self.executable, e))?;
        info!(
            "Moved {} aside to {}",
            self.executable.display(),
            backup.display()
        );

        if let Err(e) = fs::rename(staged, &self.executable) {
            warn!("Install failed, putting the previous executable back: {}", e);
            if let Err(restore) = fs::rename(&backup, &self.executable) {
                warn!(
                    "Could not restore {} from {}: {}",
                    self.executable.display(),
                    backup.display(),
                    restore
                );
            }
            return Err(UpdateError::io("install", &self.executable, e));
        }

        info!("Installed new binary at {}", self.executable.display());
        Ok(self.executable.clone())
    }
}

/// Mark a downloaded binary executable
pub fn make_executable(path: &Path) -> Result<(), UpdateError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .map_err(|e| UpdateError::io("chmod", path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plan(dir: &TempDir, exe: &str, strategy: SwapStrategy) -> SwapPlan {
        SwapPlan {
            executable: dir.path().join(exe),
            staging_dir: dir.path().to_path_buf(),
            backup_suffix: "old".to_string(),
            strategy,
        }
    }

    #[test]
    fn test_paths() {
        let dir = TempDir::new().unwrap();

        let p = plan(&dir, "client_app.exe", SwapStrategy::Replace);
        assert_eq!(p.backup_path(), dir.path().join("client_app.exe.old"));
        assert_eq!(
            p.staged_path(&Version::new(1, 2, 0)),
            dir.path().join("client_app_v1.2.0.exe")
        );

        let p = plan(&dir, "deskhelperd", SwapStrategy::Replace);
        assert_eq!(p.backup_path(), dir.path().join("deskhelperd.old"));
        assert_eq!(
            p.staged_path(&Version::new(2, 0, 0)),
            dir.path().join("deskhelperd_v2.0.0")
        );
        assert_ne!(p.staged_path(&Version::new(2, 0, 0)), p.executable);
    }

    #[test]
    fn test_replace_moves_old_aside() {
        let dir = TempDir::new().unwrap();
        let p = plan(&dir, "deskhelperd", SwapStrategy::Replace);
        let staged = p.staged_path(&Version::new(2, 0, 0));
        fs::write(&p.executable, b"old build").unwrap();
        fs::write(&staged, b"new build").unwrap();

        let launch = p.install(&staged).unwrap();

        assert_eq!(launch, p.executable);
        assert_eq!(fs::read(&p.executable).unwrap(), b"new build");
        assert_eq!(fs::read(p.backup_path()).unwrap(), b"old build");
        assert!(!staged.exists());
    }

    #[test]
    fn test_replace_overwrites_stale_backup() {
        let dir = TempDir::new().unwrap();
        let p = plan(&dir, "deskhelperd", SwapStrategy::Replace);
        let staged = p.staged_path(&Version::new(3, 0, 0));
        fs::write(p.backup_path(), b"ancient build").unwrap();
        fs::write(&p.executable, b"old build").unwrap();
        fs::write(&staged, b"new build").unwrap();

        p.install(&staged).unwrap();

        assert_eq!(fs::read(p.backup_path()).unwrap(), b"old build");
    }

    #[test]
    fn test_failed_install_restores_executable() {
        let dir = TempDir::new().unwrap();
        let p = plan(&dir, "deskhelperd", SwapStrategy::Replace);
        fs::write(&p.executable, b"old build").unwrap();
        let missing = dir.path().join("never-downloaded");

        let err = p.install(&missing).unwrap_err();

        assert_eq!(err.kind(), "io");
        assert_eq!(fs::read(&p.executable).unwrap(), b"old build");
        assert!(!p.backup_path().exists());
    }

    #[test]
    fn test_missing_executable_fails_before_touching_anything() {
        let dir = TempDir::new().unwrap();
        let p = plan(&dir, "deskhelperd", SwapStrategy::Replace);
        let staged = p.staged_path(&Version::new(2, 0, 0));
        fs::write(&staged, b"new build").unwrap();

        let err = p.install(&staged).unwrap_err();

        assert!(err.to_string().contains("back up"));
        assert_eq!(fs::read(&staged).unwrap(), b"new build");
    }

    #[test]
    fn test_launch_staged_leaves_executable_alone() {
        let dir = TempDir::new().unwrap();
        let p = plan(&dir, "deskhelperd", SwapStrategy::LaunchStaged);
        let staged = p.staged_path(&Version::new(2, 0, 0));
        fs::write(&p.executable, b"old build").unwrap();
        fs::write(&staged, b"new build").unwrap();

        let launch = p.install(&staged).unwrap();

        assert_eq!(launch, staged);
        assert_eq!(fs::read(&p.executable).unwrap(), b"old build");
        assert!(!p.backup_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin");
        fs::write(&path, b"#!/bin/sh\n").unwrap();

        make_executable(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }
}
