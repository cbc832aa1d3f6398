pub mod catalog;
pub mod models;

pub use catalog::{CatalogSource, ShopifyClient, ShopifyError};
pub use models::{Image, Product};
