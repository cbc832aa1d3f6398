use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub products: Vec<ProductOutcome>,
    pub assets_uploaded: usize,
    pub asset_cache_hits: usize,
}

impl MigrationReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            products: Vec::new(),
            assets_uploaded: 0,
            asset_cache_hits: 0,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn migrated(&self) -> usize {
        self.products
            .iter()
            .filter(|outcome| outcome.error.is_none())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.products.len() - self.migrated()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductOutcome {
    pub product_id: u64,
    pub title: String,
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct StageReport {
    pub name: String,
    pub elapsed_ms: u128,
    pub timestamp: DateTime<Utc>,
}

impl StageReport {
    pub fn new(name: &str, elapsed_ms: u128) -> Self {
        Self {
            name: name.to_string(),
            elapsed_ms,
            timestamp: Utc::now(),
        }
    }
}
