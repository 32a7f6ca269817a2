//! 观测性初始化。

pub mod events;

use std::path::Path;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

pub const LOG_FILE_PREFIX: &str = "geovoice.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the stdout subscriber. Fails if a global subscriber already exists.
pub fn init_tracing() -> Result<()> {
    let fmt_layer = fmt::layer().with_target(false);
    let subscriber = Registry::default().with(env_filter()).with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| anyhow!("failed to set global subscriber: {err}"))
}

pub(crate) fn file_appender(dir: &Path) -> RollingFileAppender {
    rolling::daily(dir, LOG_FILE_PREFIX)
}

/// Stdout plus a daily-rolling file under `dir`. Keep the guard alive to flush.
pub fn init_tracing_with_file(dir: &Path) -> Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(dir));
    let subscriber = Registry::default()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().json().with_writer(writer));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| anyhow!("failed to set global subscriber: {err}"))?;
    Ok(guard)
}
