//! Update check, apply and the background loop.

use super::download;
use super::install::{make_executable, SwapPlan};
use super::process::ProcessControl;
use super::ticker::Tick;
use anyhow::{Context, Result};
use deskhelper_common::{
    is_update_available, ManifestCheck, UpdateConfig, UpdateError, UpdateManifest, Version,
    VersionSource,
};
use reqwest::StatusCode;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};

/// Result of comparing the manifest against the running version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    UpToDate { current: Version, latest: Version },
    /// Manifest parsed but lacks required fields
    Incomplete { missing: Vec<&'static str> },
    Available {
        current: Version,
        manifest: UpdateManifest,
    },
}

/// How one update cycle ended
#[derive(Debug)]
pub enum CycleOutcome {
    UpToDate,
    /// Nothing usable in the manifest this time
    NoUpdate,
    Failed(UpdateError),
    /// New binary launched and exit requested
    Restarted { version: Version },
}

/// What the loop did before it returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: usize,
    pub restarted: bool,
}

pub struct UpdateChecker {
    client: reqwest::Client,
    manifest_url: String,
    request_timeout: Option<Duration>,
    download_timeout: Option<Duration>,
    source: VersionSource,
    swap: SwapPlan,
    process: Arc<dyn ProcessControl>,
}

impl UpdateChecker {
    /// Build a checker from config. `builtin` is this binary's package version.
    pub fn from_config(
        config: &UpdateConfig,
        builtin: &str,
        process: Arc<dyn ProcessControl>,
    ) -> Result<Self> {
        let source = VersionSource::from_config(config, builtin)
            .context("Invalid version source configuration")?;
        match &source {
            VersionSource::Marker(marker) => {
                info!(path = %marker.path().display(), "Current version read from marker")
            }
            VersionSource::Builtin(version) => info!("Current version is built in: {}", version),
        }

        let executable = match &config.executable_path {
            Some(path) => path.clone(),
            None => std::env::current_exe().context("Failed to locate running executable")?,
        };
        let staging_dir = match &config.staging_dir {
            Some(dir) => dir.clone(),
            None => executable
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let mut builder =
            reqwest::Client::builder().user_agent(format!("deskhelper/{}", builtin));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            manifest_url: config.manifest_url.trim().to_string(),
            request_timeout: config.request_timeout(),
            download_timeout: config.download_timeout(),
            source,
            swap: SwapPlan {
                executable,
                staging_dir,
                backup_suffix: config.backup_suffix.clone(),
                strategy: config.swap_strategy,
            },
            process,
        })
    }

    async fn fetch_manifest(&self) -> Result<Vec<u8>, UpdateError> {
        let mut request = self.client.get(&self.manifest_url);
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpdateError::transport(&self.manifest_url, e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Manifest response received");
        if status != StatusCode::OK {
            return Err(UpdateError::ManifestStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpdateError::transport(&self.manifest_url, e))?;
        Ok(body.to_vec())
    }

    /// Read the current version and compare it with the manifest
    pub async fn check(&self) -> Result<CheckOutcome, UpdateError> {
        let current = self.source.current()?;
        let body = self.fetch_manifest().await?;

        match UpdateManifest::from_json(&body)? {
            ManifestCheck::Incomplete { missing } => Ok(CheckOutcome::Incomplete { missing }),
            ManifestCheck::Complete(manifest) => {
                if is_update_available(&current, &manifest.version) {
                    Ok(CheckOutcome::Available { current, manifest })
                } else {
                    Ok(CheckOutcome::UpToDate {
                        current,
                        latest: manifest.version,
                    })
                }
            }
        }
    }

    /// Download, record, install and launch `manifest`'s binary.
    /// Returns the path that was launched.
    pub async fn apply(&self, manifest: &UpdateManifest) -> Result<PathBuf, UpdateError> {
        let staging_dir = &self.swap.staging_dir;
        tokio::fs::create_dir_all(staging_dir)
            .await
            .map_err(|e| UpdateError::io("create", staging_dir, e))?;

        let staged = self.swap.staged_path(&manifest.version);
        info!(
            "⬇️  Downloading {} to {}",
            manifest.download_url,
            staged.display()
        );
        let bytes = download::download_to(
            &self.client,
            &manifest.download_url,
            &staged,
            self.download_timeout,
        )
        .await?;
        info!("Downloaded {} bytes", bytes);

        make_executable(&staged)?;
        self.source.record(&manifest.version)?;
        let launch = self.swap.install(&staged)?;

        self.process
            .spawn_detached(&launch)
            .map_err(|source| UpdateError::Spawn {
                path: launch.clone(),
                source,
            })?;

        Ok(launch)
    }

    /// One full cycle. Failures are logged and returned, never propagated.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let outcome = match self.check().await {
            Ok(outcome) => outcome,
            Err(e) => {
                log_failure(&e);
                return CycleOutcome::Failed(e);
            }
        };

        match outcome {
            CheckOutcome::UpToDate { current, latest } => {
                info!(%current, %latest, "Up to date");
                CycleOutcome::UpToDate
            }
            CheckOutcome::Incomplete { missing } => {
                warn!(
                    "Update manifest is missing {}, skipping",
                    missing.join(", ")
                );
                CycleOutcome::NoUpdate
            }
            CheckOutcome::Available { current, manifest } => {
                info!(
                    %current,
                    latest = %manifest.version,
                    "📦  New version available"
                );
                match self.apply(&manifest).await {
                    Ok(launch) => {
                        info!(
                            "🔄  Started {} (v{}), exiting",
                            launch.display(),
                            manifest.version
                        );
                        self.process.exit(0);
                        CycleOutcome::Restarted {
                            version: manifest.version,
                        }
                    }
                    Err(e) => {
                        log_failure(&e);
                        CycleOutcome::Failed(e)
                    }
                }
            }
        }
    }

    /// Run a cycle per tick until the channel closes or an update restarts us.
    ///
    /// Each cycle runs in its own task, so a panic inside one is logged and
    /// the loop keeps going. The tick is finished once its cycle has ended.
    pub async fn run(self: Arc<Self>, mut ticks: mpsc::Receiver<Tick>) -> LoopSummary {
        info!("🔄  Update checker started ({})", self.manifest_url);
        let mut cycles = 0;

        while let Some(tick) = ticks.recv().await {
            cycles += 1;
            let checker = Arc::clone(&self);
            match tokio::spawn(async move { checker.run_cycle().await }).await {
                Ok(CycleOutcome::Restarted { .. }) => {
                    return LoopSummary {
                        cycles,
                        restarted: true,
                    };
                }
                Ok(_) => {}
                Err(e) => error!("❌  Update cycle aborted: {}", e),
            }
            tick.finish();
        }

        debug!("Tick source closed, update checker stopping");
        LoopSummary {
            cycles,
            restarted: false,
        }
    }
}

/// Server-side refusals are warnings; network, download and local failures are errors
fn failure_level(e: &UpdateError) -> Level {
    match e {
        UpdateError::ManifestStatus { .. }
        | UpdateError::MalformedManifest(_)
        | UpdateError::InvalidVersion(_) => Level::WARN,
        _ => Level::ERROR,
    }
}

fn log_failure(e: &UpdateError) {
    if failure_level(e) == Level::WARN {
        warn!(kind = e.kind(), "Update check skipped: {}", e);
    } else {
        error!(kind = e.kind(), "❌  Update check failed: {}", e);
    }
}
