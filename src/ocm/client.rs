use crate::config::OcmConfig;
use crate::http::build_client;
use crate::ocm::items::ProductItemRequest;
use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcmError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Digital asset record as returned by the item-creation endpoint. Fields not
/// modelled here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalAssetMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub repository_id: String,
    pub fields: DigitalAssetFields,
    pub file_extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitalAssetFields {
    pub title: String,
    pub alternatetext: String,
}

/// Binary part of an asset upload.
#[derive(Debug, Clone)]
pub struct AssetFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn create_digital_asset(
        &self,
        metadata: &DigitalAssetMetadata,
        file: AssetFile,
    ) -> Result<UploadedAsset, OcmError>;

    async fn create_item(&self, request: &ProductItemRequest) -> Result<Value, OcmError>;
}

#[derive(Debug, Clone)]
pub struct OcmClient {
    items_url: String,
    token: String,
    http: Client,
}

impl OcmClient {
    pub fn new(config: &OcmConfig) -> Self {
        Self {
            items_url: config.items_url(),
            token: config.token.clone(),
            http: build_client(),
        }
    }

    fn post(&self) -> RequestBuilder {
        self.http
            .post(&self.items_url)
            .bearer_auth(&self.token)
            .header("X-Requested-With", "XMLHttpRequest")
    }
}

#[async_trait]
impl ContentApi for OcmClient {
    async fn create_digital_asset(
        &self,
        metadata: &DigitalAssetMetadata,
        file: AssetFile,
    ) -> Result<UploadedAsset, OcmError> {
        let item = serde_json::to_string(metadata).map_err(|err| OcmError::Request(err.to_string()))?;
        let item_part = Part::text(item)
            .file_name("blob")
            .mime_str("application/json")
            .map_err(|err| OcmError::Request(err.to_string()))?;
        let file_part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime)
            .map_err(|err| OcmError::Request(err.to_string()))?;
        let form = Form::new().part("item", item_part).part("file", file_part);

        let response = self
            .post()
            .multipart(form)
            .send()
            .await
            .map_err(|err| OcmError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(OcmError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }
        response
            .json::<UploadedAsset>()
            .await
            .map_err(|err| OcmError::Decode(err.to_string()))
    }

    async fn create_item(&self, request: &ProductItemRequest) -> Result<Value, OcmError> {
        let response = self
            .post()
            .json(request)
            .send()
            .await
            .map_err(|err| OcmError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(OcmError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }
        response
            .json::<Value>()
            .await
            .map_err(|err| OcmError::Decode(err.to_string()))
    }
}
