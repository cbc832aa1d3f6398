use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client. Timeouts are opt-in: large image downloads must not be
/// cut off by a default deadline.
pub fn build_client() -> Client {
    let mut builder = Client::builder();
    if let Some(timeout) = env_secs("HTTP_TIMEOUT_SECS") {
        builder = builder.timeout(timeout);
    }
    if let Some(connect) = env_secs("HTTP_CONNECT_TIMEOUT_SECS") {
        builder = builder.connect_timeout(connect);
    }
    builder.build().unwrap_or_else(|_| Client::new())
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .map(Duration::from_secs)
}
