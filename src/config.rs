use std::{env, path::PathBuf};
use thiserror::Error;

const DEFAULT_PAGE_LIMIT: u32 = 250;
const DEFAULT_JPEG_QUALITY: u8 = 90;
const DEFAULT_MEDIA_INPUT_DIR: &str = "src/media";
const DEFAULT_MEDIA_OUTPUT_DIR: &str = "src/output";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid value for `{key}`: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    pub base_url: String,
    pub product_path: String,
    pub access_token: String,
    pub page_limit: u32,
}

impl ShopifyConfig {
    pub fn products_url(&self) -> String {
        format!("{}{}", self.base_url, self.product_path)
    }
}

#[derive(Debug, Clone)]
pub struct OcmConfig {
    pub base_url: String,
    pub token: String,
    pub image_type: String,
    pub repository_id: String,
}

impl OcmConfig {
    pub fn items_url(&self) -> String {
        format!("{}/content/management/api/v1.1/items", self.base_url)
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub shopify: ShopifyConfig,
    pub ocm: OcmConfig,
    pub media: MediaConfig,
}

impl MigrationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Blank values count
    /// as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let page_limit = match get("SHOPIFY_PAGE_LIMIT") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or(ConfigError::Invalid {
                    key: "SHOPIFY_PAGE_LIMIT",
                    value: raw,
                })?,
            None => DEFAULT_PAGE_LIMIT,
        };

        let jpeg_quality = match get("TRANSCODE_JPEG_QUALITY") {
            Some(raw) => raw
                .parse::<u8>()
                .map(|v| v.clamp(1, 100))
                .map_err(|_| ConfigError::Invalid {
                    key: "TRANSCODE_JPEG_QUALITY",
                    value: raw,
                })?,
            None => DEFAULT_JPEG_QUALITY,
        };

        Ok(Self {
            shopify: ShopifyConfig {
                base_url: required("SHOPIFY_URL")?.trim_end_matches('/').to_string(),
                product_path: required("SHOPIFY_RELATIVE_PRODUCT_API")?,
                access_token: required("SHOPIFY_ACCESS_TOKEN")?,
                page_limit,
            },
            ocm: OcmConfig {
                base_url: required("OCM_URL")?.trim_end_matches('/').to_string(),
                token: required("OCM_TOKEN")?,
                image_type: required("OCM_Image_Type")?,
                repository_id: required("REPO")?,
            },
            media: MediaConfig {
                input_dir: get("MEDIA_INPUT_DIR")
                    .unwrap_or_else(|| DEFAULT_MEDIA_INPUT_DIR.into())
                    .into(),
                output_dir: get("MEDIA_OUTPUT_DIR")
                    .unwrap_or_else(|| DEFAULT_MEDIA_OUTPUT_DIR.into())
                    .into(),
                jpeg_quality,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SHOPIFY_URL", "https://shop.example.com/"),
            ("SHOPIFY_RELATIVE_PRODUCT_API", "/admin/api/2023-01/products.json"),
            ("SHOPIFY_ACCESS_TOKEN", "shpat_123"),
            ("OCM_URL", "https://ocm.example.com"),
            ("OCM_TOKEN", "ocm-token"),
            ("OCM_Image_Type", "Image"),
            ("REPO", "REPO-1"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<MigrationConfig, ConfigError> {
        MigrationConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn loads_required_settings_with_defaults() {
        let config = load(&base_vars()).expect("config");
        assert_eq!(
            config.shopify.products_url(),
            "https://shop.example.com/admin/api/2023-01/products.json"
        );
        assert_eq!(config.shopify.page_limit, 250);
        assert_eq!(
            config.ocm.items_url(),
            "https://ocm.example.com/content/management/api/v1.1/items"
        );
        assert_eq!(config.ocm.image_type, "Image");
        assert_eq!(config.media.input_dir, PathBuf::from("src/media"));
        assert_eq!(config.media.output_dir, PathBuf::from("src/output"));
        assert_eq!(config.media.jpeg_quality, 90);
    }

    #[test]
    fn blank_required_value_is_missing() {
        let mut vars = base_vars();
        vars.insert("OCM_TOKEN", "   ");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("OCM_TOKEN"));
        vars.remove("REPO");
        vars.insert("OCM_TOKEN", "t");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("REPO"));
    }

    #[test]
    fn optional_overrides_are_parsed() {
        let mut vars = base_vars();
        vars.insert("SHOPIFY_PAGE_LIMIT", "2");
        vars.insert("TRANSCODE_JPEG_QUALITY", "250");
        vars.insert("MEDIA_INPUT_DIR", "/tmp/in");
        let config = load(&vars).expect("config");
        assert_eq!(config.shopify.page_limit, 2);
        assert_eq!(config.media.jpeg_quality, 100);
        assert_eq!(config.media.input_dir, PathBuf::from("/tmp/in"));
        assert!(matches!(
            load(&HashMap::from_iter(
                base_vars()
                    .into_iter()
                    .chain([("SHOPIFY_PAGE_LIMIT", "zero")])
            )),
            Err(ConfigError::Invalid { key: "SHOPIFY_PAGE_LIMIT", .. })
        ));
    }
}
