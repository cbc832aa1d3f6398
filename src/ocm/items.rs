use crate::ocm::{ContentApi, OcmError, UploadedAsset, sanitize_name};
use crate::shopify::Product;
use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;
use std::sync::Arc;
use tracing::{info, warn};

pub const PRODUCT_ITEM_TYPE: &str = "Product-SKU";

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItemRequest {
    pub name: String,
    pub slug: Option<String>,
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub repository_id: String,
    pub fields: ItemFields,
    #[serde(rename = "primary_image")]
    pub primary_image: Option<AssetReference>,
    pub gallery: Option<Vec<AssetReference>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFields {
    pub seo_title: String,
    pub asset_tags: String,
    pub vendor_name: String,
    pub display_name: String,
}

/// The reduced asset shape a product item links to.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReference {
    pub file_extension: Option<String>,
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
}

impl From<&UploadedAsset> for AssetReference {
    fn from(asset: &UploadedAsset) -> Self {
        Self {
            file_extension: asset.file_extension.clone(),
            id: asset.id.clone(),
            name: asset.name.clone(),
            asset_type: asset.asset_type.clone(),
        }
    }
}

pub fn build_product_item(
    product: &Product,
    primary: Option<&UploadedAsset>,
    gallery: &[Arc<UploadedAsset>],
    repository_id: &str,
) -> ProductItemRequest {
    let gallery = if gallery.is_empty() {
        None
    } else {
        Some(
            gallery
                .iter()
                .map(|asset| AssetReference::from(asset.as_ref()))
                .collect(),
        )
    };
    ProductItemRequest {
        name: sanitize_name(&product.title),
        slug: product.sku().map(str::to_string),
        item_type: PRODUCT_ITEM_TYPE,
        repository_id: repository_id.to_string(),
        fields: ItemFields {
            seo_title: product.title.clone(),
            asset_tags: product.tags.clone(),
            vendor_name: product.vendor.clone(),
            display_name: product.title.clone(),
        },
        primary_image: primary.map(AssetReference::from),
        gallery,
    }
}

#[derive(Clone)]
pub struct ProductRecorder {
    api: Arc<dyn ContentApi>,
    repository_id: String,
}

impl ProductRecorder {
    pub fn new(api: Arc<dyn ContentApi>, repository_id: impl Into<String>) -> Self {
        Self {
            api,
            repository_id: repository_id.into(),
        }
    }

    pub async fn create(
        &self,
        product: &Product,
        primary: Option<&UploadedAsset>,
        gallery: &[Arc<UploadedAsset>],
    ) -> Result<Value, OcmError> {
        let request = build_product_item(product, primary, gallery, &self.repository_id);
        if request.slug.is_none() {
            warn!(target = "ocm_migrate.ocm", product_id = product.id, "product_without_sku");
        }
        let record = self.api.create_item(&request).await?;
        let item_id = record.get("id").and_then(Value::as_str).unwrap_or_default();
        info!(
            target = "ocm_migrate.ocm",
            product_id = product.id,
            item_id,
            gallery = request.gallery.as_ref().map(Vec::len).unwrap_or(0),
            "product item created"
        );
        Ok(record)
    }
}
