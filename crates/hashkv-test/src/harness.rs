//! Test harness helpers.

use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test writer so it shows up only for
/// failing tests. Safe to call from every test.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// [`setup_test_logging`] at `warn`, which surfaces dropped scan keys.
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}

/// Redis URL for live tests, from `HASHKV_TEST_REDIS_URL`.
///
/// Returns `None` when unset so ignored live tests can bail out quietly.
#[must_use]
pub fn live_redis_url() -> Option<String> {
    std::env::var("HASHKV_TEST_REDIS_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// A namespace unique to this process and `label`, for live tests that share
/// a server.
#[must_use]
pub fn unique_namespace(label: &str) -> String {
    format!("hashkv-test-{label}-{}", std::process::id())
}
