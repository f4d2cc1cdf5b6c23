use mqx_telemetry::{TelemetryConfig, init_telemetry};

#[test]
fn existing_global_subscriber_is_an_error() {
    tracing::subscriber::set_global_default(tracing_subscriber::registry())
        .expect("first global subscriber");

    let cfg = TelemetryConfig::from_env("mqx-telemetry-test", "0.0.0");
    let err = init_telemetry(&cfg).expect_err("second subscriber must be rejected");
    assert!(
        err.to_string().contains("already installed"),
        "unexpected error: {err:#}"
    );
}
