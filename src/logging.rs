//! Tracing subscriber setup.
//!
//! Diagnostics go to stderr so that command output on stdout stays
//! machine-readable (`intake analyze --json | jq`). `RUST_LOG` overrides the
//! default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "info,intake_harness=debug,sqlx=warn";

pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init();
}
