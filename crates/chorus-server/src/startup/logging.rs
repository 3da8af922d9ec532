//! Console logging for the Chorus server.
//!
//! Every crate logs through `tracing`; survey work runs inside a per-node
//! `survey` span, so each event carries the `node_id` of the node that
//! handled it. `RUST_LOG` overrides the configured level.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is unset
    pub level: Level,
    /// Include the event target (module path)
    pub with_target: bool,
    /// Emit ANSI colors
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: true,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Create from a level name; unknown names fall back to `info`
    pub fn from_level(level: &str) -> Self {
        Self {
            level: level.parse().unwrap_or(Level::INFO),
            ..Default::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

/// Initialize the global tracing subscriber.
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let console_layer = fmt::layer()
        .with_target(config.with_target)
        .with_thread_names(true)
        .with_ansi(config.ansi)
        .with_filter(config.env_filter());

    Registry::default()
        .with(console_layer)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    tracing::debug!(level = %config.level, "Logging initialized");
    Ok(())
}
