//! Logging and metric helpers shared by mqx tools.
//!
//! Metrics go through the `metrics` facade and are no-ops until a recorder
//! is installed by the embedding process.

use anyhow::Result;

mod config;
mod metrics;
mod tracing_init;

pub use config::{LogFormat, TelemetryConfig};
pub use metrics::{
    EXCHANGE_TOTAL, PROVIDER_ERRORS_TOTAL, ROUND_TRIP_MS, record_exchange, record_provider_error,
    record_round_trip,
};
pub use tracing_init::init_telemetry;

/// Installs the subscriber configured from `RUST_LOG` / `LOG_FORMAT`.
pub fn install(service_name: &str, service_version: &str) -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env(service_name, service_version))
}
