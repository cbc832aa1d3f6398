use crate::media::{ImageStore, LocalImage, MediaError};
use crate::ocm::client::{AssetFile, DigitalAssetFields, DigitalAssetMetadata};
use crate::ocm::{ContentApi, OcmError, UploadedAsset, sanitize_name};
use crate::shopify::{Image, Product};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("could not read transcoded file: {0}")]
    Read(String),
    #[error(transparent)]
    Ocm(#[from] OcmError),
}

/// Uploads product images as OCM digital assets, at most once per source
/// image id for the lifetime of the uploader.
pub struct AssetUploader {
    api: Arc<dyn ContentApi>,
    images: Arc<dyn ImageStore>,
    asset_type: String,
    repository_id: String,
    uploaded: HashMap<u64, Arc<UploadedAsset>>,
}

impl AssetUploader {
    pub fn new(
        api: Arc<dyn ContentApi>,
        images: Arc<dyn ImageStore>,
        asset_type: impl Into<String>,
        repository_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            images,
            asset_type: asset_type.into(),
            repository_id: repository_id.into(),
            uploaded: HashMap::new(),
        }
    }

    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }

    pub fn cached(&self, image_id: u64) -> Option<Arc<UploadedAsset>> {
        self.uploaded.get(&image_id).cloned()
    }

    /// Returns the asset for `image`, uploading it only on the first request
    /// for its id. `&mut self` keeps the check and the insert on one writer.
    pub async fn upload(
        &mut self,
        product: &Product,
        image: &Image,
    ) -> Result<Arc<UploadedAsset>, UploadError> {
        if let Some(existing) = self.uploaded.get(&image.id) {
            crate::metrics::cache_hit("asset");
            debug!(target = "ocm_migrate.assets", image_id = image.id, asset_id = %existing.id, "asset already uploaded");
            return Ok(existing.clone());
        }

        let local = self.images.local_copy(&image.src).await?;
        let metadata = self.metadata_for(&local, image);
        let bytes = tokio::fs::read(&local.path)
            .await
            .map_err(|err| UploadError::Read(format!("{}: {err}", local.path.display())))?;
        let file = AssetFile {
            file_name: local.file_name.clone(),
            mime: mime_for(&local.extension),
            bytes,
        };

        let asset = Arc::new(self.api.create_digital_asset(&metadata, file).await?);
        info!(
            target = "ocm_migrate.assets",
            product_id = product.id,
            image_id = image.id,
            asset_id = %asset.id,
            file = %local.file_name,
            "digital asset created"
        );
        self.uploaded.insert(image.id, asset.clone());
        Ok(asset)
    }

    fn metadata_for(&self, local: &LocalImage, image: &Image) -> DigitalAssetMetadata {
        let alt = image
            .alt
            .as_deref()
            .filter(|alt| !alt.is_empty())
            .unwrap_or(" ");
        DigitalAssetMetadata {
            name: sanitize_name(&local.file_name),
            asset_type: self.asset_type.clone(),
            repository_id: self.repository_id.clone(),
            fields: DigitalAssetFields {
                title: local.file_name.clone(),
                alternatetext: alt.to_string(),
            },
            file_extension: local.extension.clone(),
        }
    }
}

fn mime_for(extension: &str) -> String {
    match extension {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "" => "application/octet-stream".to_string(),
        "svg" => "image/svg+xml".to_string(),
        "tif" => "image/tiff".to_string(),
        other => format!("image/{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeImages, RecordingApi};
    use serde_json::json;

    fn product() -> Product {
        serde_json::from_value(json!({"id": 1, "title": "Shirt"})).unwrap()
    }

    fn image(id: u64, src: &str, alt: Option<&str>) -> Image {
        Image {
            id,
            src: src.into(),
            alt: alt.map(str::to_string),
        }
    }

    fn uploader_with(api: Arc<RecordingApi>) -> (AssetUploader, Arc<FakeImages>) {
        let images = Arc::new(FakeImages::new());
        (
            AssetUploader::new(api, images.clone(), "Image", "REPO-1"),
            images,
        )
    }

    #[tokio::test]
    async fn second_upload_of_same_id_reuses_cached_record() {
        let api = Arc::new(RecordingApi::default());
        let (mut uploader, images) = uploader_with(api.clone());
        let img = image(10, "http://x/shirt.jpg", None);

        let first = uploader.upload(&product(), &img).await.expect("first");
        let second = uploader.upload(&product(), &img).await.expect("second");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(api.upload_count(), 1);
        assert_eq!(images.requested.lock().unwrap().len(), 1);
        assert_eq!(uploader.uploaded_count(), 1);
    }

    #[tokio::test]
    async fn metadata_sanitizes_name_and_defaults_alt_text() {
        let api = Arc::new(RecordingApi::default());
        let (mut uploader, _) = uploader_with(api.clone());

        uploader
            .upload(&product(), &image(1, "http://x/pic#1&.jpg", None))
            .await
            .expect("upload");
        uploader
            .upload(&product(), &image(2, "http://x/back.png", Some("Back view")))
            .await
            .expect("upload");

        let uploads = api.uploads.lock().unwrap();
        let first = &uploads[0];
        assert_eq!(first.metadata.name, "pic1.jpg");
        assert_eq!(first.metadata.fields.title, "pic#1&.jpg");
        assert_eq!(first.metadata.fields.alternatetext, " ");
        assert_eq!(first.metadata.asset_type, "Image");
        assert_eq!(first.metadata.repository_id, "REPO-1");
        assert_eq!(first.metadata.file_extension, "jpg");
        assert_eq!(first.file_name, "pic#1&.jpg");
        assert_eq!(first.mime, "image/jpeg");
        assert_eq!(uploads[1].metadata.fields.alternatetext, "Back view");
        assert_eq!(uploads[1].mime, "image/png");
    }

    #[tokio::test]
    async fn failed_upload_is_not_cached() {
        let api = Arc::new(RecordingApi::failing_on("a.jpg"));
        let (mut uploader, _) = uploader_with(api);

        let err = uploader
            .upload(&product(), &image(5, "http://x/a.jpg", None))
            .await
            .expect_err("fails");

        assert!(matches!(err, UploadError::Ocm(OcmError::Request(_))));
        assert!(uploader.cached(5).is_none());
    }

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(mime_for("jpeg"), "image/jpeg");
        assert_eq!(mime_for("png"), "image/png");
        assert_eq!(mime_for("webp"), "image/webp");
        assert_eq!(mime_for(""), "application/octet-stream");
    }
}
