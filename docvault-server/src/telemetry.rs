//! Logging setup: human-readable stderr output plus an optional rolling JSON
//! log file.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogRotation, LoggingConfig};

fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process. `RUST_LOG` takes precedence over
/// [`LoggingConfig::level`].
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter(config));

    let Some(directory) = &config.directory else {
        tracing_subscriber::registry()
            .with(stderr_layer)
            .try_init()
            .context("failed to install tracing subscriber")?;
        return Ok(None);
    };

    std::fs::create_dir_all(directory)
        .with_context(|| format!("cannot create log directory '{}'", directory.display()))?;

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation(config.rotation))
        .filename_prefix(&config.file_prefix);
    if config.max_log_files > 0 {
        builder = builder.max_log_files(config.max_log_files);
    }
    let appender = builder.build(directory).context("failed to create rolling log file")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_writer(writer)
        .with_filter(filter(config));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(Some(guard))
}
