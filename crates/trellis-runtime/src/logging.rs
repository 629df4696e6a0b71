//! Subscriber setup for planner runs.
//!
//! Planner crates log under their own targets at the configured level; every
//! other target is held at `warn` or quieter, so a host application's
//! chatter stays out of planner output. Per-target `filters` are applied on
//! top, and a set `RUST_LOG` replaces the computed filter entirely.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! span_timings = true          # log busy/idle time when `analyze` closes
//!
//! [logging.filters]
//! trellis_planner = "trace"
//! ```

use std::ffi::OsStr;
use std::path::Path;

use thiserror::Error;
use tracing::debug;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LoggingConfig};

/// Targets the configured level applies to.
pub const PLANNER_TARGETS: [&str; 4] = [
    "trellis",
    "trellis_core",
    "trellis_planner",
    "trellis_runtime",
];

/// Most verbose level allowed for targets outside the planner.
const FOREIGN_CEILING: LogLevel = LogLevel::Warn;

const DEFAULT_LOG_FILE: &str = "trellis.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors raised while installing the subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("cannot open log file: {0}")]
    LogFile(#[from] InitError),

    #[error("a global subscriber is already installed")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Installs the global subscriber described by `config`.
///
/// Returns `Ok(false)` without touching global state when logging is
/// disabled.
pub fn install(config: &LoggingConfig) -> Result<bool, LoggingError> {
    if !config.enabled {
        return Ok(false);
    }

    let layer = format_layer(config, make_writer(config)?);
    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter(config))
        .try_init()?;
    Ok(true)
}

/// Like [`install`], but keeps whatever subscriber is already in place.
pub fn init_from_config(config: &LoggingConfig) {
    if let Err(err) = install(config) {
        debug!(error = %err, "Logging left unchanged");
    }
}

/// Filter directives for `config`, least specific first.
pub fn filter_directives(config: &LoggingConfig) -> Vec<String> {
    let foreign = config.level.max(FOREIGN_CEILING);
    let mut directives = vec![foreign.as_str().to_string()];
    directives.extend(
        PLANNER_TARGETS
            .iter()
            .map(|target| format!("{target}={}", config.level)),
    );
    directives.extend(
        config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={level}")),
    );
    directives
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(filter_directives(config).join(","))
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
}

fn make_writer(config: &LoggingConfig) -> Result<BoxMakeWriter, InitError> {
    let writer = match (config.output, &config.file_path) {
        (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
        (LogOutput::File, Some(path)) => BoxMakeWriter::new(log_file(path)?),
        (LogOutput::File, None) | (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
    };
    Ok(writer)
}

/// A single, never-rotated log file at `path`.
fn log_file(path: &Path) -> Result<RollingFileAppender, InitError> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(directory)
}

fn format_layer(config: &LoggingConfig, writer: BoxMakeWriter) -> BoxedLayer {
    let span_events = if config.span_timings {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events)
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location);

    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
        _ => layer.boxed(),
    }
}
