use crate::media::{ImageStore, LocalImage, MediaError};
use crate::ocm::client::{AssetFile, DigitalAssetMetadata};
use crate::ocm::items::ProductItemRequest;
use crate::ocm::{ContentApi, OcmError, UploadedAsset};
use async_trait::async_trait;
use axum::Router;
use serde_json::{Map, Value, json};
use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tempfile::TempDir;

/// Serves `app` on an ephemeral localhost port and returns its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}

/// Raw HTTP server that promises `declared` bytes, sends only `sent`, then
/// closes the connection. Returns its base URL and a connection counter.
pub async fn spawn_truncating_server(declared: usize, sent: usize) -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\n\r\n");
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&vec![0xAB; sent]).await;
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{addr}"), connections)
}

/// Image store that writes a placeholder file per URL instead of downloading.
pub struct FakeImages {
    dir: TempDir,
    pub requested: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn local_copy(&self, url: &str) -> Result<LocalImage, MediaError> {
        self.requested.lock().unwrap().push(url.to_string());
        let file_name = url
            .split('?')
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MediaError::InvalidUrl(url.to_string()))?
            .to_string();
        let path = self.dir.path().join(&file_name);
        std::fs::write(&path, b"IMG").map_err(|err| MediaError::Write(err.to_string()))?;
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_lowercase();
        Ok(LocalImage {
            path,
            file_name,
            extension,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub metadata: DigitalAssetMetadata,
    pub file_name: String,
    pub mime: String,
}

/// In-memory CMS that records every call.
#[derive(Default)]
pub struct RecordingApi {
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub items: Mutex<Vec<ProductItemRequest>>,
    /// Uploads of this file name fail with HTTP 500.
    pub fail_file: Option<String>,
}

impl RecordingApi {
    pub fn failing_on(file_name: &str) -> Self {
        Self {
            fail_file: Some(file_name.to_string()),
            ..Self::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn items(&self) -> Vec<ProductItemRequest> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentApi for RecordingApi {
    async fn create_digital_asset(
        &self,
        metadata: &DigitalAssetMetadata,
        file: AssetFile,
    ) -> Result<UploadedAsset, OcmError> {
        if self.fail_file.as_deref() == Some(file.file_name.as_str()) {
            return Err(OcmError::Request("HTTP 500 Internal Server Error".into()));
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(RecordedUpload {
            metadata: metadata.clone(),
            file_name: file.file_name,
            mime: file.mime,
        });
        Ok(UploadedAsset {
            id: format!("CONT{}", uploads.len()),
            name: metadata.name.clone(),
            asset_type: metadata.asset_type.clone(),
            file_extension: Some(metadata.file_extension.clone()),
            extra: Map::new(),
        })
    }

    async fn create_item(&self, request: &ProductItemRequest) -> Result<Value, OcmError> {
        let mut items = self.items.lock().unwrap();
        items.push(request.clone());
        Ok(json!({"id": format!("CORE{}", items.len()), "type": request.item_type}))
    }
}
