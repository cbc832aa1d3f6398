mod config;
mod http;
mod media;
mod metrics;
mod models;
mod ocm;
mod pipeline;
mod shopify;
#[cfg(test)]
mod test_support;

use config::MigrationConfig;
use eyre::WrapErr;
use pipeline::Migration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "ocm_migrate", "migration aborted: {err:#}");
    }
}

async fn run() -> eyre::Result<()> {
    let env_file = dotenvy::dotenv();
    init_tracing();
    if let Err(err) = env_file
        && !err.not_found()
    {
        warn!(target = "ocm_migrate", error = %err, "env_file_unreadable");
    }

    let config = MigrationConfig::from_env().wrap_err("loading configuration")?;
    let mut migration = Migration::from_config(&config);
    let report = migration.run().await.wrap_err("migration run")?;

    for outcome in report.products.iter().filter(|p| p.error.is_some()) {
        warn!(
            target = "ocm_migrate",
            product_id = outcome.product_id,
            title = %outcome.title,
            error = outcome.error.as_deref().unwrap_or_default(),
            "product not migrated"
        );
    }
    info!(
        target = "ocm_migrate",
        run_id = %report.run_id,
        products = report.products.len(),
        migrated = report.migrated(),
        failed = report.failed(),
        assets_uploaded = report.assets_uploaded,
        asset_cache_hits = report.asset_cache_hits,
        elapsed_ms = report
            .finished_at
            .map(|end| (end - report.started_at).num_milliseconds())
            .unwrap_or_default(),
        "migration finished"
    );
    match serde_json::to_string(&report) {
        Ok(json) => debug!(target = "ocm_migrate", report = %json, "migration_report"),
        Err(err) => warn!(target = "ocm_migrate", error = %err, "report_not_serializable"),
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
