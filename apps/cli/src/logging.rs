//! Logging initialization for the CLI
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::registry().with(build_env_filter(config));

    if config.json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "leadscope={level},leadscope_filters={level},leadscope_query={level}",
            level = config.level
        ))
    })
}
