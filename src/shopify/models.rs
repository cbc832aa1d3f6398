use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ProductsPage {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<Image>,
}

impl Product {
    /// SKU of the first variant, if it carries a non-blank one.
    pub fn sku(&self) -> Option<&str> {
        self.variants
            .first()
            .and_then(|variant| variant.sku.as_deref())
            .map(str::trim)
            .filter(|sku| !sku.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub id: u64,
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Image>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Image>>::deserialize(deserializer)?.unwrap_or_default())
}
