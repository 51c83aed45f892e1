//! # Observability Infrastructure
//!
//! Structured logging setup for the compiler. The pipeline itself only emits
//! `tracing` events; installing a subscriber is the embedding application's
//! choice, made through [`init_logging`].

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set (trace, debug, info, warn, error)
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        let log_level = std::env::var("EDGEPLANE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let json_logging = std::env::var("EDGEPLANE_JSON_LOGGING")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        Self { log_level, json_logging }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. A subscriber
/// installed elsewhere (e.g. by integration tests) is left in place.
pub fn init_logging(config: &LoggingConfig) {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &config.log_level);
    }

    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder()
                .with_env_filter(EnvFilter::from_default_env())
                .json()
                .finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish(),
        )
    };

    if installed.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
}
