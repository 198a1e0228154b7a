//! Structured logging setup

use crate::config::EngineConfig;
use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the env filter: `RUST_LOG` wins over the configured directive
pub fn env_filter(config: &EngineConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// Install the global tracing subscriber
pub fn init_logging(config: &EngineConfig) -> anyhow::Result<()> {
    let (json_layer, pretty_layer) = if config.json_logs {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        (None, Some(layer))
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(json_layer)
        .with(pretty_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    info!(
        json = config.json_logs,
        filter = %config.log_filter,
        "Logging initialized"
    );
    Ok(())
}
