//! Launching the replacement binary and leaving.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::info;

/// Process-level side effects of an update
pub trait ProcessControl: Send + Sync {
    /// Start `program` so that it outlives this process
    fn spawn_detached(&self, program: &Path) -> io::Result<()>;

    /// End this process. The real implementation does not return.
    fn exit(&self, code: i32);
}

/// The running daemon
#[derive(Debug, Clone)]
pub struct CurrentProcess {
    args: Vec<OsString>,
}

impl CurrentProcess {
    /// Relaunches reuse this process's arguments
    pub fn new() -> Self {
        Self {
            args: std::env::args_os().skip(1).collect(),
        }
    }
}

impl Default for CurrentProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControl for CurrentProcess {
    fn spawn_detached(&self, program: &Path) -> io::Result<()> {
        let mut command = Command::new(program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        let child = command.spawn()?;
        info!(pid = child.id(), "Started {}", program.display());
        Ok(())
    }

    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}
