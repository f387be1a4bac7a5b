//! Structured logging setup on top of `tracing-subscriber`.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the embedding application. [`LoggingBuilder`] is a convenience for
//! applications and tests that want the usual console or JSON output.

use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Minimum level of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Convert from verbosity level (0-3+).
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!(
                "Invalid log level '{}'. Valid options: trace, debug, info, warn, error",
                s
            )),
        }
    }
}

/// Output format of the console subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `confparse::tree=trace`
    pub filter: Option<String>,
    pub ansi_colors: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            filter: None,
            ansi_colors: true,
            with_target: false,
        }
    }
}

/// Builder for the global `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct LoggingBuilder {
    config: LoggingConfig,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.config.ansi_colors = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.config.with_target = enabled;
        self
    }

    /// Set an `EnvFilter` directive; `RUST_LOG` still wins when set.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.filter = Some(filter.into());
        self
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    fn build_filter(&self) -> EnvFilter {
        let default_filter = self.config.level.as_str();
        match self.config.filter {
            Some(ref filter) => EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
            None => {
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
            }
        }
    }

    /// Build a formatting layer that can be composed with other layers.
    pub fn build_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync,
    {
        let filter = self.build_filter();
        match self.config.format {
            LogFormat::Pretty => Box::new(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(self.config.ansi_colors)
                    .with_target(self.config.with_target)
                    .with_filter(filter),
            ),
            LogFormat::Compact => Box::new(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(self.config.ansi_colors)
                    .with_target(self.config.with_target)
                    .with_filter(filter),
            ),
            LogFormat::Json => Box::new(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(self.config.with_target)
                    .with_filter(filter),
            ),
        }
    }

    /// Install the global subscriber, failing if one is already installed.
    pub fn init(self) -> anyhow::Result<()> {
        tracing_subscriber::registry()
            .with(self.build_layer::<tracing_subscriber::Registry>())
            .try_init()
            .map_err(|e| anyhow::anyhow!("cannot install logging subscriber: {}", e))
    }

    /// Install the global subscriber unless one is already installed.
    ///
    /// Returns true when this call installed it.
    pub fn try_init(self) -> bool {
        self.init().is_ok()
    }
}
