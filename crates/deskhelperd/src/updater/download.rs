//! Streamed binary download.

use deskhelper_common::UpdateError;
use reqwest::StatusCode;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// In-progress download name for `dest`
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Download `url` into `dest`, returning the byte count.
///
/// Data lands in `<dest>.part` first and is renamed once the body is
/// complete, so `dest` only ever holds a whole file. On any failure the
/// partial file is removed.
pub async fn download_to(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Option<Duration>,
) -> Result<u64, UpdateError> {
    let mut request = client.get(url);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let mut response = request
        .send()
        .await
        .map_err(|e| UpdateError::transport(url, e))?;

    if response.status() != StatusCode::OK {
        return Err(UpdateError::DownloadStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let part = partial_path(dest);
    let written = match write_body(&mut response, url, &part).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&part).await {
                warn!("Could not remove partial download {}: {}", part.display(), rm);
            }
            return Err(e);
        }
    };

    tokio::fs::rename(&part, dest)
        .await
        .map_err(|e| UpdateError::io("rename", &part, e))?;
    Ok(written)
}

async fn write_body(
    response: &mut reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<u64, UpdateError> {
    let mut file = File::create(path)
        .await
        .map_err(|e| UpdateError::io("create", path, e))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| UpdateError::transport(url, e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| UpdateError::io("write", path, e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| UpdateError::io("flush", path, e))?;
    file.sync_all()
        .await
        .map_err(|e| UpdateError::io("sync", path, e))?;

    debug!("Wrote {} bytes to {}", written, path.display());
    Ok(written)
}
