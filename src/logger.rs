use std::sync::Arc;
use std::time::Duration;

use spdlog::sink::{RotatingFileSink, RotationPolicy, Sink, StdStream, StdStreamSink};
use spdlog::{Level, LevelFilter, Logger};

use crate::config::{Config, Log, LogLevel};

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Critical => Level::Critical,
            LogLevel::Error => Level::Error,
            LogLevel::Warn => Level::Warn,
            LogLevel::Info => Level::Info,
            LogLevel::Debug => Level::Debug,
            LogLevel::Trace => Level::Trace,
        }
    }
}

// stdout belongs to the command output (JSON, listings), log lines go to stderr
fn console_sink() -> spdlog::Result<Arc<dyn Sink>> {
    let sink = StdStreamSink::builder()
        .std_stream(StdStream::Stderr)
        .build()?;
    Ok(Arc::new(sink))
}

fn file_sink(log: &Log) -> spdlog::Result<Option<Arc<dyn Sink>>> {
    let Some(ref location) = log.location else {
        return Ok(None);
    };
    let sink = RotatingFileSink::builder()
        .base_path(location)
        .rotation_policy(RotationPolicy::Daily { hour: 0, minute: 0 })
        .max_files(30)
        .rotate_on_open(false)
        .build()?;
    Ok(Some(Arc::new(sink)))
}

fn build_logger(log: &Log) -> spdlog::Result<Arc<Logger>> {
    let mut builder = Logger::builder();
    builder.name("postgraph");

    let file = file_sink(log)?;
    let has_file = file.is_some();
    if let Some(file) = file {
        builder.sink(file);
    }
    if log.log_to_console || !has_file {
        builder.sink(console_sink()?);
    }

    let logger = Arc::new(builder.build()?);
    logger.set_level_filter(LevelFilter::MoreSevereEqual(log.level.into()));
    logger.set_flush_level_filter(LevelFilter::MoreSevereEqual(Level::Warn));
    logger.set_flush_period(Some(Duration::from_secs(2)));
    Ok(logger)
}

/// Without a `[log]` section the default spdlog logger stays in place and
/// only reports warnings.
pub fn configure_logger(config: &Config) -> spdlog::Result<()> {
    match config.log {
        None => spdlog::default_logger().set_level_filter(LevelFilter::MoreSevereEqual(Level::Warn)),
        Some(ref log) => spdlog::set_default_logger(build_logger(log)?),
    }
    Ok(())
}
