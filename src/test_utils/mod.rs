//! Test utilities for epsync
//!
//! Shared by unit tests and, through the `test-utils` feature, by the
//! integration tests:
//!
//! - [`init_test_logging`] - one-time tracing setup that plays well with the
//!   test harness
//! - [`ZipFixture`] - builds episode archives in memory
//! - [`TestEnvironment`] - an isolated app home plus episodes directory

pub mod environment;
pub mod fixtures;

pub use environment::TestEnvironment;
pub use fixtures::ZipFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber once, however many tests call it.
/// `level` wins when given; otherwise `RUST_LOG` is used, and with neither
/// nothing is logged.
///
/// ```bash
/// RUST_LOG=epsync=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
