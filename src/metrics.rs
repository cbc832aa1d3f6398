use tracing::trace;

// Trace-level counters only; no exporter is wired for a one-shot run.

pub fn stage_elapsed(stage: &'static str, elapsed_ms: u128) {
    trace!(
        target = "ocm_migrate.metrics",
        stage = stage,
        elapsed_ms = elapsed_ms as u64,
        "stage_elapsed"
    );
}

pub fn cache_hit(cache: &'static str) {
    trace!(
        target = "ocm_migrate.metrics",
        cache = cache,
        "cache_hit_inc"
    );
}
