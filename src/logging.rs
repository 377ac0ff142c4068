//! Logging setup for petty.
//!
//! Library code only emits `tracing` events. The binary installs one
//! subscriber at startup through [`init_cli_logging`]; everything goes to
//! stderr so JSON and CSV on stdout stay parseable.

use std::time::Instant;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Subscriber settings picked from the CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include timestamps and module targets.
    pub detailed: bool,
    /// Enable ANSI colors.
    pub colors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, for `--verbose`.
    Pretty,
    /// One line per event.
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            detailed: false,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Errors only.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            detailed: false,
            colors: true,
        }
    }

    /// Debug events with timestamps and targets.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            detailed: true,
            colors: true,
        }
    }

    /// Preset for the CLI flags; `quiet` wins over `verbose`.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: bool, colors: bool) -> Self {
        let preset = if quiet {
            Self::quiet()
        } else if verbose {
            Self::verbose()
        } else {
            Self::default()
        };
        Self { colors, ..preset }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    fn directive(self) -> String {
        let level = match self.level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Debug => "debug",
        };
        format!("petty={level}")
    }
}

/// Install the global subscriber. Later calls are ignored.
///
/// `RUST_LOG`, when set, replaces the level from `config`.
pub fn init_logging(config: LogConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.directive())
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colors)
        .with_target(config.detailed);

    let layer = match (config.format, config.detailed) {
        (LogFormat::Pretty, true) => layer.pretty().boxed(),
        (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()
        .ok();
}

/// Initialize logging from the global CLI flags.
pub fn init_cli_logging(quiet: bool, verbose: bool, colors: bool) {
    init_logging(LogConfig::from_flags(quiet, verbose, colors));
}

/// Logs the start and end of an operation with its duration.
pub struct OperationGuard {
    name: String,
    start: Instant,
}

impl OperationGuard {
    /// Start tracking an operation.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::info!(operation = %name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Complete the operation successfully.
    pub fn complete(self) {
        tracing::info!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            "Operation completed"
        );
    }

    /// Mark the operation as failed.
    pub fn fail(self, error: &dyn std::error::Error) {
        tracing::error!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            error = %error,
            "Operation failed"
        );
    }
}
