//! Reveal a folder in the desktop file browser.
//!
//! Each platform has one shell command for this. Commands go through a
//! `CommandRunner` so the HTTP layer can be exercised without launching
//! anything.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum OpenError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    Status { program: String, status: String },
}

/// Desktop family, decides which opener command is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellPlatform {
    Windows,
    MacOs,
    Unix,
}

/// A fully resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<OsString>,
    /// Wait for the program and treat a non-zero exit as failure
    pub check_status: bool,
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

impl ShellPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            ShellPlatform::Windows
        } else if cfg!(target_os = "macos") {
            ShellPlatform::MacOs
        } else {
            ShellPlatform::Unix
        }
    }

    pub fn command(&self, path: &Path) -> ShellCommand {
        match self {
            // No shell in between: the path is one argv entry, never parsed.
            // explorer exits non-zero even when the window opens.
            ShellPlatform::Windows => ShellCommand {
                program: "explorer.exe".to_string(),
                args: vec![path.as_os_str().to_owned()],
                check_status: false,
            },
            ShellPlatform::MacOs => ShellCommand {
                program: "open".to_string(),
                args: vec![path.as_os_str().to_owned()],
                check_status: true,
            },
            ShellPlatform::Unix => ShellCommand {
                program: "xdg-open".to_string(),
                args: vec![path.as_os_str().to_owned()],
                check_status: true,
            },
        }
    }
}

/// Executes shell commands on behalf of the opener
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &ShellCommand) -> Result<(), OpenError>;
}

/// Runs commands for real
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ShellCommand) -> Result<(), OpenError> {
        debug!("Running {}", command);
        let launch_error = |source: io::Error| OpenError::Launch {
            program: command.program.clone(),
            source,
        };
        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if !command.check_status {
            process.spawn().map_err(launch_error)?;
            return Ok(());
        }

        let status: ExitStatus = process.status().map_err(launch_error)?;

        if status.success() {
            Ok(())
        } else {
            Err(OpenError::Status {
                program: command.program.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// Validated folder path taken from a request, if it names something on disk
///
/// Blank strings are rejected; anything else is checked exactly as sent.
pub fn resolve_folder(raw: Option<&str>) -> Option<PathBuf> {
    let raw = raw.filter(|s| !s.trim().is_empty())?;
    let path = PathBuf::from(raw);
    path.exists().then_some(path)
}

#[derive(Clone)]
pub struct FolderOpener {
    platform: ShellPlatform,
    runner: Arc<dyn CommandRunner>,
}

impl FolderOpener {
    pub fn new(platform: ShellPlatform, runner: Arc<dyn CommandRunner>) -> Self {
        Self { platform, runner }
    }

    /// Opener for this machine using real processes
    pub fn system() -> Self {
        Self::new(ShellPlatform::current(), Arc::new(SystemRunner))
    }

    pub fn open(&self, path: &Path) -> Result<(), OpenError> {
        self.runner.run(&self.platform.command(path))
    }
}
