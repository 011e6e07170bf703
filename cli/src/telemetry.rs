//! Tracing-subscriber initialization, mirroring the teacher's
//! `mcp-server/src/telemetry.rs`: one `EnvFilter` (env overrides the
//! configured level), one of three formatters selected by config.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

pub fn init_telemetry(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level)).context("invalid log level configuration")?;

    let registry = Registry::default().with(env_filter);

    match config.format {
        LogFormat::Pretty => {
            registry.with(fmt::layer().pretty().with_target(true).with_file(true).with_line_number(true)).init();
        }
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_target(true).with_file(true).with_line_number(true).flatten_event(true)).init();
        }
        LogFormat::Compact => {
            registry.with(fmt::layer().compact().with_target(false).with_file(false)).init();
        }
    }

    tracing::info!(log_level = %config.level, log_format = ?config.format, "telemetry initialized");
    Ok(())
}
