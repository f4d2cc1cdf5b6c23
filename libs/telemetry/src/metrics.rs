use std::time::Duration;

pub const EXCHANGE_TOTAL: &str = "mqx_exchange_total";
pub const ROUND_TRIP_MS: &str = "mqx_round_trip_ms";
pub const PROVIDER_ERRORS_TOTAL: &str = "mqx_provider_errors_total";

/// Counts a finished exchange by outcome (`success` / `failure`).
pub fn record_exchange(outcome: &'static str) {
    ::metrics::counter!(EXCHANGE_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_round_trip(elapsed: Duration) {
    ::metrics::histogram!(ROUND_TRIP_MS).record(elapsed.as_secs_f64() * 1000.0);
}

pub fn record_provider_error(stage: &'static str) {
    ::metrics::counter!(PROVIDER_ERRORS_TOTAL, "stage" => stage).increment(1);
}
