//! Logging setup for the command line
//!
//! The engine only emits `tracing` events; installing a subscriber is left to the
//! binary. Settings are layered: defaults, then `WIREKIT_LOG_LEVEL` /
//! `WIREKIT_LOG_FORMAT`, then command line flags. `RUST_LOG` still takes
//! precedence over the level when set.

use std::fmt;
use std::str::FromStr;

pub const LEVEL_VAR: &str = "WIREKIT_LOG_LEVEL";
pub const FORMAT_VAR: &str = "WIREKIT_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`, expected text or json")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Level after `count` verbosity flags
    pub fn raised(self, count: u8) -> Self {
        let levels = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];
        let current = levels.iter().position(|l| *l == self).unwrap_or(1);
        levels[(current + count as usize).min(levels.len() - 1)]
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    /// Apply environment overrides; unparsable values are ignored.
    pub fn with_env(self, level: Option<&str>, format: Option<&str>) -> Self {
        Self {
            level: level.and_then(|l| l.parse().ok()).unwrap_or(self.level),
            format: format.and_then(|f| f.parse().ok()).unwrap_or(self.format),
        }
    }

    pub fn from_env() -> Self {
        let level = std::env::var(LEVEL_VAR).ok();
        let format = std::env::var(FORMAT_VAR).ok();
        Self::default().with_env(level.as_deref(), format.as_deref())
    }

    /// Install the global subscriber, writing to stderr.
    pub fn init(self) {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);
        // a subscriber may already be installed (tests), keep it
        let _ = match self.format {
            LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
            LogFormat::Text => tracing::subscriber::set_global_default(builder.compact().finish()),
        };
    }
}
