//! Subscriber installation.
//!
//! `RUST_LOG` selects what is emitted (default `info`); `WAREHOUSE_LOG_FORMAT`
//! picks `json` (default) or `compact` output.

use core::str::FromStr;

use anyhow::{anyhow, Context};
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_FORMAT: &str = "WAREHOUSE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable single-line output.
    Compact,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "compact" | "text" => Ok(LogFormat::Compact),
            other => Err(anyhow!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_directive: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_directive: "info".to_string(),
        }
    }
}

impl LogSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut settings = Self::default();
        if let Ok(raw) = std::env::var(ENV_LOG_FORMAT) {
            settings.format = raw.parse().with_context(|| format!("invalid {ENV_LOG_FORMAT}"))?;
        }
        Ok(settings)
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }
}

/// Install the global subscriber described by `settings`.
///
/// Fails if a global subscriber is already installed.
pub fn try_init(settings: &LogSettings) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(settings.filter())
        .with_target(false);

    match settings.format {
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    }
    .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Initialize from the environment, ignoring "already initialized".
pub fn init() {
    let settings = LogSettings::from_env().unwrap_or_default();
    if try_init(&settings).is_ok() {
        ::tracing::debug!(format = ?settings.format, "logging initialized");
    }
}
