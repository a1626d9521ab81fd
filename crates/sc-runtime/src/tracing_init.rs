use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Initialise a global `tracing` subscriber writing to stderr.
///
/// Precedence: `RUST_LOG` overrides `level` entirely, matching the
/// teacher's "env var wins" rule. `json` selects
/// `tracing_subscriber::fmt::layer().json()` over the default
/// human-readable formatter; there is no custom event formatter here (no
/// per-rule domain tagging exists in this crate).
pub fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(level).map_err(|e| anyhow::anyhow!("invalid log filter '{level}': {e}"))?
    };

    let registry = tracing_subscriber::registry();
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false).with_filter(filter))
            .try_init()
            .map_err(|e| anyhow::anyhow!("tracing subscriber already initialized: {e}"))
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_filter(filter))
            .try_init()
            .map_err(|e| anyhow::anyhow!("tracing subscriber already initialized: {e}"))
    }
}
