use crate::media::MediaError;
use futures::StreamExt;
use reqwest::Client;
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub transferred: u64,
    /// Only known when the server sends `Content-Length`.
    pub total: Option<u64>,
}

impl DownloadProgress {
    pub fn percent(&self) -> Option<u64> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some(((self.transferred as f64 / total as f64) * 100.0).round() as u64),
            None => None,
        }
    }
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.total, self.percent()) {
            (Some(total), Some(percent)) => {
                write!(f, "{}/{} ({}%)", self.transferred, total, percent)
            }
            _ => write!(f, "{}", self.transferred),
        }
    }
}

/// Sidecar path the body is streamed into before the final rename, so an
/// interrupted download never looks like a cached file.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Streams `url` into `dest`, returning the number of bytes written. A failed
/// download leaves its `.part` file behind.
pub async fn stream_download(http: &Client, url: &str, dest: &Path) -> Result<u64, MediaError> {
    let started = Instant::now();
    let file_label = dest.display().to_string();
    info!(target = "ocm_migrate.download", %url, file = %file_label, "download started");

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|err| MediaError::Download(err.to_string()))?;
    if !response.status().is_success() {
        return Err(MediaError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| MediaError::Write(err.to_string()))?;
    }
    let partial = partial_path(dest);
    let mut file = tokio::fs::File::create(&partial)
        .await
        .map_err(|err| MediaError::Write(err.to_string()))?;

    let mut progress = DownloadProgress {
        transferred: 0,
        total: response.content_length(),
    };
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| MediaError::Download(err.to_string()))?;
        file.write_all(&chunk)
            .await
            .map_err(|err| MediaError::Write(err.to_string()))?;
        progress.transferred += chunk.len() as u64;
        debug!(target = "ocm_migrate.download", file = %file_label, %progress, "progress");
    }
    file.flush()
        .await
        .map_err(|err| MediaError::Write(err.to_string()))?;
    drop(file);

    tokio::fs::rename(&partial, dest)
        .await
        .map_err(|err| MediaError::Write(err.to_string()))?;
    let elapsed_ms = started.elapsed().as_millis();
    crate::metrics::stage_elapsed("download", elapsed_ms);
    info!(
        target = "ocm_migrate.download",
        file = %file_label,
        bytes = progress.transferred,
        elapsed_ms = elapsed_ms as u64,
        "file downloaded"
    );
    Ok(progress.transferred)
}
