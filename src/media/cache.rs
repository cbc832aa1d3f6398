use crate::config::MediaConfig;
use crate::http::build_client;
use crate::media::{MediaError, download::stream_download, transcode::transcode};
use async_trait::async_trait;
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

/// A transcoded image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub path: PathBuf,
    /// File name as it appears in the source URL, percent-decoded.
    pub file_name: String,
    /// Lowercase extension without the dot; empty when the URL has none.
    pub extension: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn local_copy(&self, url: &str) -> Result<LocalImage, MediaError>;
}

/// Download cache under `input_dir` plus transcoded copies under `output_dir`.
/// Entries are never invalidated or removed.
#[derive(Debug, Clone)]
pub struct MediaCache {
    config: MediaConfig,
    http: Client,
}

impl MediaCache {
    pub fn new(config: MediaConfig) -> Self {
        Self::with_client(config, build_client())
    }

    pub fn with_client(config: MediaConfig, http: Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl ImageStore for MediaCache {
    async fn local_copy(&self, url: &str) -> Result<LocalImage, MediaError> {
        let file_name = source_file_name(url)?;
        let source = self.config.input_dir.join(cache_file_name(url, &file_name));

        if tokio::fs::try_exists(&source).await.unwrap_or(false) {
            crate::metrics::cache_hit("media");
            info!(target = "ocm_migrate.media", file = %source.display(), "using cached download");
        } else {
            stream_download(&self.http, url, &source).await?;
        }

        let path = transcode(
            source,
            self.config.output_dir.clone(),
            self.config.jpeg_quality,
        )
        .await?;
        Ok(LocalImage {
            path,
            extension: extension_of(&file_name),
            file_name,
        })
    }
}

/// Last path segment of `url` with query and fragment dropped.
pub fn source_file_name(url: &str) -> Result<String, MediaError> {
    let parsed = Url::parse(url).map_err(|_| MediaError::InvalidUrl(url.to_string()))?;
    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| MediaError::InvalidUrl(url.to_string()))?;
    let decoded = urlencoding::decode(segment)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    if decoded.contains(['/', '\\']) || decoded == "." || decoded == ".." {
        return Err(MediaError::InvalidUrl(url.to_string()));
    }
    Ok(decoded)
}

/// Cache key: a short digest of the full source URL in front of the file
/// name, so same-named files from different URLs never collide.
pub fn cache_file_name(url: &str, file_name: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    format!("{}-{}", &digest[..16], file_name)
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}
