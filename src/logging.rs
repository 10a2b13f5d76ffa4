//! Logging and tracing initialization for feedd.
//!
//! This module provides structured logging using the `tracing` ecosystem.
//! It supports both pretty console output and JSON output for machine parsing,
//! written either to stderr or to a log file that is truncated on startup.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::AppConfig;

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    /// Truncated when logging starts.
    File(PathBuf),
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output logs as JSON (for machine parsing)
    pub json: bool,
    /// Enable verbose logging (sets default level to DEBUG)
    pub verbose: bool,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            verbose: false,
            destination: LogDestination::Stderr,
        }
    }
}

impl From<&AppConfig> for LogConfig {
    fn from(config: &AppConfig) -> Self {
        let destination = if config.debug {
            LogDestination::Stderr
        } else {
            LogDestination::File(config.log_file.clone())
        };
        Self {
            json: config.json_logs,
            verbose: config.verbose,
            destination,
        }
    }
}

/// Initialize the tracing subscriber with the given configuration.
///
/// This should be called early in main(), after config is loaded.
/// The log level can be overridden at runtime via the `RUST_LOG` environment variable.
/// Fails if the log file cannot be created.
///
/// # Examples
///
/// ```ignore
/// // Basic initialization with defaults (stderr)
/// feedd::logging::init(LogConfig::default())?;
///
/// // JSON output to a file
/// feedd::logging::init(LogConfig {
///     json: true,
///     destination: LogDestination::File("/tmp/feedd.log".into()),
///     ..Default::default()
/// })?;
/// ```
pub fn init(config: LogConfig) -> Result<()> {
    // Determine default log level based on verbose flag
    let default_level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("feedd={}", default_level.as_str().to_lowercase()))
    });

    match config.destination {
        LogDestination::Stderr => install(env_filter, config.json, std::io::stderr),
        LogDestination::File(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            install(env_filter, config.json, Mutex::new(file))
        }
    }

    Ok(())
}

fn install<W>(env_filter: EnvFilter, json: bool, writer: W)
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    if json {
        // JSON output for structured logging / log aggregation
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        // Pretty console output for human readability
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    }
}
