//! Deskhelper Daemon - local desktop helper
//!
//! Serves folder-open requests on localhost and keeps itself up to date.

use anyhow::{Context, Result};
use clap::Parser;
use deskhelper_common::Config;
use deskhelperd::opener::FolderOpener;
use deskhelperd::server::{self, AppState};
use deskhelperd::updater::{spawn_ticker, CurrentProcess, UpdateChecker};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "deskhelperd")]
#[command(about = "Local desktop helper: opens folders and self-updates", long_about = None)]
#[command(version = VERSION)]
struct Args {
    /// Config file (default: $DESKHELPER_CONFIG, then ./deskhelper.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,

    /// Override the update manifest URL
    #[arg(long)]
    manifest_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.manifest_url {
        config.update.manifest_url = url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("[BOOT] Deskhelper Daemon v{} starting", VERSION);
    match &source {
        Some(path) => info!("[BOOT] Config loaded from {}", path.display()),
        None => warn!("[BOOT] No config file found, using defaults"),
    }

    if config.update.is_active() {
        let process = Arc::new(CurrentProcess::new());
        match UpdateChecker::from_config(&config.update, VERSION, process) {
            Ok(checker) => {
                let ticks =
                    spawn_ticker(config.update.initial_delay(), config.update.interval());
                info!(
                    "[BOOT] Checking for updates every {}s",
                    config.update.interval_secs
                );
                tokio::spawn(Arc::new(checker).run(ticks));
            }
            Err(e) => error!("[BOOT] Update checker disabled: {:#}", e),
        }
    } else {
        warn!("[BOOT] Self-update disabled (no manifest_url or enabled = false)");
    }

    let state = AppState::new(FolderOpener::system());
    server::run(&config.server, state).await
}
