//! Structured logging to stderr via tracing.
//!
//! `RUST_LOG` always wins. Without it the CLI stays quiet at `warn`, or turns
//! on `sre=debug` when a debug flag is set, which is where the Jira request
//! traces show up.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(debug: bool) -> anyhow::Result<()> {
    let default_directive = if debug { "warn,sre=debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}
