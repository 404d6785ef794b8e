pub mod builders;
pub mod fake_backend;
pub mod recorder;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use sagaflow::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber once per test binary.
///
/// Output goes through the test writer, so it only shows up for failing
/// tests (or with `-- --nocapture`). The filter comes from `SAGAFLOW_LOG`,
/// then `RUST_LOG`, then `info`:
/// `SAGAFLOW_LOG=sagaflow=trace cargo test --test supervision`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("test timed out after 5 seconds")
}
