//! Tracing subscriber setup
//!
//! Console output goes to stderr so command output on stdout stays
//! clean. When `logging.error_log` is set, ERROR events are also appended
//! to that file with local timestamps.

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use chrono::{FixedOffset, Offset as _, Utc};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Timestamps in a fixed offset from UTC
#[derive(Debug, Clone, Copy)]
struct LocalTimer(FixedOffset);

impl LocalTimer {
    fn new(utc_offset_minutes: i32) -> Self {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self(offset)
    }
}

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Utc::now().with_timezone(&self.0).format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| Error::Config(format!("Invalid log level {:?}: {}", level, e))),
    }
}

fn open_error_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Build the subscriber without installing it
pub fn subscriber(
    config: &LoggingConfig,
    utc_offset_minutes: i32,
) -> Result<impl Subscriber + Send + Sync + 'static> {
    let error_layer = match config.error_log.trim() {
        "" => None,
        path => {
            let file = open_error_log(Path::new(path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_timer(LocalTimer::new(utc_offset_minutes))
                    .with_filter(LevelFilter::ERROR),
            )
        }
    };

    Ok(tracing_subscriber::registry()
        .with(env_filter(&config.level)?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(error_layer))
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, utc_offset_minutes: i32) -> Result<()> {
    subscriber(config, utc_offset_minutes)?
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialise logging: {}", e)))
}
