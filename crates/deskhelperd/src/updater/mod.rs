//! Self-update for deskhelperd
//!
//! Cycle, driven by one tick at a time:
//! 1. read the current version (marker file or builtin)
//! 2. fetch the manifest
//! 3. compare versions
//! 4. stream the new binary into the staging directory
//! 5. rewrite the version marker
//! 6. move the running executable aside and install the new one
//! 7. launch the new binary and exit
//!
//! Any failure ends the cycle with a log line; the next tick retries.
//! Steps 5-7 are not transactional: a crash between them leaves the
//! marker ahead of the installed binary, and `.old` backups stay on disk.

pub mod checker;
pub mod download;
pub mod install;
pub mod process;
pub mod ticker;

pub use checker::{CheckOutcome, CycleOutcome, LoopSummary, UpdateChecker};
pub use install::SwapPlan;
pub use process::{CurrentProcess, ProcessControl};
pub use ticker::{spawn_ticker, Tick};
