//! Structured logging for the xgbsql command
//!
//! Standard output carries the generated SQL, so console logs go to stderr.
//! Supports pretty, JSON and compact formats, and a daily rolling log file.

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "xgbsql.log";

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// JSON format (structured logging)
    Json,
    /// One line per event
    Compact,
}

impl LogFormat {
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    File,
    Both,
}

impl LogOutput {
    pub fn from_name(name: &str) -> Self {
        match name {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            _ => LogOutput::Stderr,
        }
    }
}

fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    }
}

fn file_appender(directory: &str) -> RollingFileAppender {
    std::fs::create_dir_all(directory).ok();
    RollingFileAppender::new(Rotation::DAILY, directory, LOG_FILE_PREFIX)
}

/// Initialize the global subscriber from the logging section of the config
///
/// `level` accepts anything `RUST_LOG` does, e.g. `debug` or
/// `xgbsql_compile=trace,info`. An unparsable level falls back to `info`.
pub fn init(config: &LoggingConfig) {
    let format = LogFormat::from_name(&config.format);
    let output = LogOutput::from_name(&config.output);

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer(format))
                .init();
        }
        LogOutput::File => {
            let file_layer = fmt::layer()
                .with_writer(file_appender(&config.directory))
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .init();
        }
        LogOutput::Both => {
            let file_layer = fmt::layer()
                .with_writer(file_appender(&config.directory))
                .with_ansi(false)
                .boxed();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer(format))
                .with(file_layer)
                .init();
        }
    }

    tracing::debug!(format = ?format, output = ?output, level = %config.level, "logging initialized");
}
