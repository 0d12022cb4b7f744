//! # Frame Telemetry
//!
//! Logging setup for binaries built on `frame-rpc`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use frame_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::for_component("host"))?;
//!     // Spans and events now reach the configured output
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FRAME_RPC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `FRAME_RPC_JSON_LOGS` | `false` | JSON output instead of human-readable |
//! | `FRAME_RPC_CONSOLE_OUTPUT` | `true` | Write log lines to stdout |
//! | `FRAME_RPC_SERVICE_NAME` | `frame-rpc` | Service name in log lines |

mod config;
mod logging;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging for the process.
///
/// Returns a guard to hold for the lifetime of the application; dropping it
/// logs the shutdown.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard {
        service: config.full_service_name(),
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service, "Shutting down telemetry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        };
        let first = init_telemetry(config.clone());
        // Another test may have installed the global subscriber first.
        let second = init_telemetry(config);
        assert!(first.is_err() || second.is_err());
        assert!(matches!(second, Err(TelemetryError::SubscriberInit(_))));
    }
}
