//! Logging configuration
//!
//! Read by the loader binary when it installs its subscriber. The client
//! library only emits `tracing` events.

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every packet exchange
    Trace,
    /// Connection lifecycle and batch sends
    Debug,
    #[default]
    Info,
    /// Discarded connections
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "info"
/// format = "json"
/// filter = "chwire_client=debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default: info
    pub level: LogLevel,

    /// Default: console
    pub format: LogFormat,

    /// Extra per-target directives appended after the level,
    /// in `EnvFilter` syntax
    pub filter: Option<String>,
}

impl LogConfig {
    /// Filter directives for the subscriber: the base level, then `filter`
    pub fn directives(&self) -> String {
        match self.filter.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("{},{extra}", self.level.as_str()),
            _ => self.level.as_str().to_string(),
        }
    }
}
