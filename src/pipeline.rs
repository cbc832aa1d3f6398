use crate::config::MigrationConfig;
use crate::media::{ImageStore, MediaCache};
use crate::models::{MigrationReport, ProductOutcome, StageReport};
use crate::ocm::assets::UploadError;
use crate::ocm::{AssetUploader, ContentApi, OcmClient, OcmError, ProductRecorder, UploadedAsset};
use crate::shopify::{CatalogSource, Image, Product, ShopifyClient, ShopifyError};
use serde_json::Value;
use std::{future::Future, sync::Arc, time::Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Drives the migration: one catalog fetch, then every product strictly in
/// order, each image strictly in order.
pub struct Migration {
    catalog: Arc<dyn CatalogSource>,
    assets: AssetUploader,
    recorder: ProductRecorder,
}

impl Migration {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        assets: AssetUploader,
        recorder: ProductRecorder,
    ) -> Self {
        Self {
            catalog,
            assets,
            recorder,
        }
    }

    pub fn from_config(config: &MigrationConfig) -> Self {
        let api: Arc<dyn ContentApi> = Arc::new(OcmClient::new(&config.ocm));
        let images: Arc<dyn ImageStore> = Arc::new(MediaCache::new(config.media.clone()));
        let assets = AssetUploader::new(
            api.clone(),
            images,
            config.ocm.image_type.clone(),
            config.ocm.repository_id.clone(),
        );
        let recorder = ProductRecorder::new(api, config.ocm.repository_id.clone());
        Self::new(
            Arc::new(ShopifyClient::new(config.shopify.clone())),
            assets,
            recorder,
        )
    }

    /// Fails only when the catalog cannot be read. Per-product failures are
    /// logged, recorded in the report, and the run moves on.
    pub async fn run(&mut self) -> Result<MigrationReport, PipelineError> {
        let mut report = MigrationReport::start();
        info!(target = "ocm_migrate.pipeline", run_id = %report.run_id, "migration started");

        let started = Instant::now();
        let products = self
            .catalog
            .list_products()
            .await
            .map_err(PipelineError::catalog)?;
        crate::metrics::stage_elapsed("fetch_catalog", started.elapsed().as_millis());

        for product in &products {
            info!(
                target = "ocm_migrate.pipeline",
                product_id = product.id,
                title = %product.title,
                images = product.images.len(),
                "migrating product"
            );
            let mut stages = Vec::new();
            let outcome = match self
                .migrate_product(product, &mut stages, &mut report)
                .await
            {
                Ok(record) => ProductOutcome {
                    product_id: product.id,
                    title: product.title.clone(),
                    stages,
                    item_id: record.get("id").and_then(Value::as_str).map(str::to_string),
                    error: None,
                },
                Err(err) => {
                    warn!(
                        target = "ocm_migrate.pipeline",
                        product_id = product.id,
                        stage = err.stage(),
                        kind = ?err.kind(),
                        error = %err,
                        "product_migration_failed"
                    );
                    ProductOutcome {
                        product_id: product.id,
                        title: product.title.clone(),
                        stages,
                        item_id: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            report.products.push(outcome);
        }

        report.assets_uploaded = self.assets.uploaded_count();
        report.finish();
        Ok(report)
    }

    async fn migrate_product(
        &mut self,
        product: &Product,
        stages: &mut Vec<StageReport>,
        report: &mut MigrationReport,
    ) -> Result<Value, PipelineError> {
        let primary = match &product.image {
            Some(image) => {
                Some(self.upload_image("primary_image", product, image, stages, report).await?)
            }
            None => None,
        };

        let mut gallery = Vec::with_capacity(product.images.len());
        for image in &product.images {
            gallery.push(
                self.upload_image("gallery_image", product, image, stages, report)
                    .await?,
            );
        }

        let recorder = &self.recorder;
        capture_stage(
            "create_item",
            stages,
            recorder.create(product, primary.as_deref(), &gallery),
        )
        .await
        .map_err(|err: OcmError| PipelineError::destination("create_item", err.to_string()))
    }

    async fn upload_image(
        &mut self,
        stage: &'static str,
        product: &Product,
        image: &Image,
        stages: &mut Vec<StageReport>,
        report: &mut MigrationReport,
    ) -> Result<Arc<UploadedAsset>, PipelineError> {
        if self.assets.cached(image.id).is_some() {
            report.asset_cache_hits += 1;
        }
        let assets = &mut self.assets;
        capture_stage(stage, stages, assets.upload(product, image))
            .await
            .map_err(|err| PipelineError::upload(stage, err))
    }
}

async fn capture_stage<T, E, Fut>(
    name: &'static str,
    stages: &mut Vec<StageReport>,
    fut: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let value = fut.await?;
    let elapsed_ms = started.elapsed().as_millis();
    crate::metrics::stage_elapsed(name, elapsed_ms);
    stages.push(StageReport::new(name, elapsed_ms));
    Ok(value)
}

#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {message}")]
pub struct PipelineError {
    stage: &'static str,
    message: String,
    kind: PipelineErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// The commerce platform could not be read.
    Source,
    /// Download, transcode or local file failure.
    Media,
    /// The CMS rejected or failed a request.
    Destination,
}

impl PipelineError {
    pub fn catalog(err: ShopifyError) -> Self {
        Self {
            stage: "fetch_catalog",
            message: err.to_string(),
            kind: PipelineErrorKind::Source,
        }
    }

    pub fn upload(stage: &'static str, err: UploadError) -> Self {
        let kind = match &err {
            UploadError::Media(_) | UploadError::Read(_) => PipelineErrorKind::Media,
            UploadError::Ocm(_) => PipelineErrorKind::Destination,
        };
        Self {
            stage,
            message: err.to_string(),
            kind,
        }
    }

    pub fn destination(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            kind: PipelineErrorKind::Destination,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn kind(&self) -> PipelineErrorKind {
        self.kind
    }
}
