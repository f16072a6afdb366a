//! Structured logging bootstrap.
//!
//! Thin wrapper over `tracing-subscriber`: a default filter scoped to
//! the aether crates, overridable through `RUST_LOG`, with a choice of
//! output format.

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    Pretty,
    /// Single-line output.
    Compact,
    /// JSON output for production environments.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level for the aether crates when `RUST_LOG` is unset.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
    /// Whether to include the target module in each line.
    pub show_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            show_target: true,
        }
    }
}

fn build_layer(config: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "aether_core={level},aether_feed={level}",
            level = config.level
        ))
    });

    let layer = fmt::layer().with_target(config.show_target);
    match config.format {
        LogFormat::Pretty => layer.pretty().with_filter(env_filter).boxed(),
        LogFormat::Compact => layer.compact().with_filter(env_filter).boxed(),
        LogFormat::Json => layer.json().with_filter(env_filter).boxed(),
    }
}

/// Initializes the logging system. Panics if a global subscriber is
/// already installed.
pub fn init(config: &LogConfig) {
    tracing_subscriber::registry().with(build_layer(config)).init();
}

/// Initializes the logging system, ignoring duplicate initialization.
/// Suitable for tests.
pub fn try_init(config: &LogConfig) {
    let _ = tracing_subscriber::registry()
        .with(build_layer(config))
        .try_init();
}
