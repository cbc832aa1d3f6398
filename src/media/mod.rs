pub mod cache;
pub mod download;
pub mod transcode;

use thiserror::Error;

pub use cache::{ImageStore, LocalImage, MediaCache};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid image url: {0}")]
    InvalidUrl(String),
    #[error("download failed: {0}")]
    Download(String),
    #[error("could not write file to system: {0}")]
    Write(String),
    #[error("transcode failed: {0}")]
    Transcode(String),
}
