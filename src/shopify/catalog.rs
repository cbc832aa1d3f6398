use crate::config::ShopifyConfig;
use crate::http::build_client;
use crate::shopify::models::{Product, ProductsPage};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid products payload: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, ShopifyError>;
}

#[derive(Debug, Clone)]
pub struct ShopifyClient {
    config: ShopifyConfig,
    http: Client,
}

impl ShopifyClient {
    pub fn new(config: ShopifyConfig) -> Self {
        Self {
            config,
            http: build_client(),
        }
    }
}

#[async_trait]
impl CatalogSource for ShopifyClient {
    /// Reads a single page of products; callers needing more than
    /// `page_limit` items must raise the limit.
    async fn list_products(&self) -> Result<Vec<Product>, ShopifyError> {
        let url = self.config.products_url();
        info!(target = "ocm_migrate.shopify", %url, limit = self.config.page_limit, "fetching products");
        let response = self
            .http
            .get(&url)
            .query(&[("limit", self.config.page_limit)])
            .header("X-Shopify-Access-Token", &self.config.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|err| ShopifyError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ShopifyError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|err| ShopifyError::Request(err.to_string()))?;
        let page: ProductsPage =
            serde_json::from_str(&body).map_err(|err| ShopifyError::Decode(err.to_string()))?;
        info!(target = "ocm_migrate.shopify", count = page.products.len(), "products fetched");
        Ok(page.products)
    }
}
