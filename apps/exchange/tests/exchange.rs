use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use mqx_bus::{
    ConnectionFactory, Consumer, Fault, InMemoryProvider, Producer, ResourceKind, Session,
};
use mqx_core::{
    ConnectionProperties, Credentials, DEFAULT_CHANNEL, Destination, EXIT_FAILURE, EXIT_SUCCESS,
    EXIT_UNSET, Outcome, ProviderError, Stage, TextMessage,
};
use mqx_exchange::{Cli, Console, ExchangeConfig, ExchangeRunner};

fn config(args: &[&str]) -> ExchangeConfig {
    let argv = std::iter::once("mqx-exchange").chain(args.iter().copied());
    Cli::try_parse_from(argv).expect("parse args").into_config()
}

async fn run(
    args: &[&str],
    factory: &dyn ConnectionFactory,
) -> (Outcome, String) {
    let cfg = config(args);
    let mut console = Console::new(Vec::new());
    let outcome = ExchangeRunner::new(&cfg, factory).run(&mut console).await;
    let out = String::from_utf8(console.into_inner()).expect("utf8 console");
    (outcome, out)
}

fn sample_provider() -> InMemoryProvider {
    InMemoryProvider::new().require_credentials(Credentials::new("admin", "passw0rd"))
}

#[tokio::test]
async fn defaults_round_trip_succeeds() {
    let provider = sample_provider();
    let (outcome, out) = run(&[], &provider).await;

    assert_eq!(outcome.exit_code(), EXIT_SUCCESS);
    let Outcome::Success { sent, received } = outcome else {
        panic!("expected success, got:\n{out}");
    };
    assert!(sent.body.starts_with("Your lucky number today is "));
    assert_eq!(received.as_deref(), Some(sent.body.as_str()));

    assert!(out.starts_with("Host: localhost : port: 1414\n"), "{out}");
    assert!(out.contains("Sent message:\n"), "{out}");
    assert!(out.contains(&format!("\nReceived message:\n{}\n", sent.body)), "{out}");
    assert!(out.ends_with("SUCCESS\n"), "{out}");

    let connections = provider.connections();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0], ConnectionProperties::default());
    assert_eq!(provider.depth("EAU.ISO20OUT.REQUEST.QL.MEBGLBK"), 0);
    assert!(provider.ledger().all_released());
}

#[tokio::test]
async fn host_and_port_overrides_reach_the_provider() {
    let provider = sample_provider();
    let (outcome, _) = run(&["broker.example.com", "1415"], &provider).await;
    assert!(outcome.is_success());

    let props = &provider.connections()[0];
    assert_eq!(props.host, "broker.example.com");
    assert_eq!(props.port, 1415);
    assert_eq!(props.channel, DEFAULT_CHANNEL);
    assert_eq!(
        props.credentials,
        Some(Credentials::new("admin", "passw0rd"))
    );
    assert!(props.cipher_spec.is_none());
}

#[tokio::test]
async fn disabled_authentication_sends_no_credentials() {
    let provider = InMemoryProvider::new();
    let (outcome, out) = run(&["h", "1414", "CH", "false"], &provider).await;
    assert!(outcome.is_success());
    assert!(out.contains("Authentication: disabled"), "{out}");

    let props = &provider.connections()[0];
    assert_eq!(props.host, "h");
    assert_eq!(props.channel, "CH");
    assert!(props.credentials.is_none());
}

#[tokio::test]
async fn cipher_spec_is_passed_through() {
    let provider = sample_provider();
    let (outcome, _) = run(
        &["h", "1414", "CH", "true", "TLS_RSA_WITH_AES_256_CBC_SHA256"],
        &provider,
    )
    .await;
    assert!(outcome.is_success());
    assert_eq!(
        provider.connections()[0].cipher_spec.as_deref(),
        Some("TLS_RSA_WITH_AES_256_CBC_SHA256")
    );
}

#[tokio::test]
async fn connect_failure_prints_linked_causes_then_failure() {
    let provider = InMemoryProvider::new().with_fault(
        Fault::new(Stage::Connect, "JMSWMQ0018: failed to connect to queue manager 'AEQT'")
            .caused_by("JMSCMQ0001: call failed with reason 2538 (MQRC_HOST_NOT_AVAILABLE)")
            .caused_by("connection refused"),
    );
    let (outcome, out) = run(&[], &provider).await;

    assert_eq!(outcome.exit_code(), EXIT_FAILURE);
    assert_ne!(outcome.exit_code(), EXIT_UNSET);
    let tail: Vec<&str> = out.lines().rev().take(5).collect();
    assert_eq!(
        tail,
        vec![
            "FAILURE",
            "connection refused",
            "JMSCMQ0001: call failed with reason 2538 (MQRC_HOST_NOT_AVAILABLE)",
            "Inner exception(s):",
            "connect failed: JMSWMQ0018: failed to connect to queue manager 'AEQT'",
        ]
    );
    assert!(!out.contains("Sent message:"), "{out}");
    assert_eq!(provider.ledger().opened(ResourceKind::Session), 0);
}

#[tokio::test]
async fn every_failing_stage_fails_the_run_and_releases_handles() {
    for stage in [
        Stage::Connect,
        Stage::Authenticate,
        Stage::ResolveDestination,
        Stage::CreateProducer,
        Stage::Send,
        Stage::CreateConsumer,
        Stage::Receive,
        Stage::Close,
    ] {
        let provider = sample_provider().with_fault(Fault::new(stage, "injected"));
        let (outcome, out) = run(&[], &provider).await;

        assert_eq!(outcome.exit_code(), EXIT_FAILURE, "stage {stage}");
        match &outcome {
            Outcome::Failure(err) => assert_eq!(err.stage(), stage),
            Outcome::Success { .. } => panic!("stage {stage} did not fail"),
        }
        assert!(out.ends_with("FAILURE\n"), "stage {stage}: {out}");

        let ledger = provider.ledger();
        assert!(ledger.all_released(), "stage {stage}: {ledger:?}");
        for kind in [
            ResourceKind::Session,
            ResourceKind::Producer,
            ResourceKind::Consumer,
        ] {
            assert!(ledger.closed(kind) <= 1, "stage {stage}: {ledger:?}");
        }
    }
}

#[tokio::test]
async fn failure_after_send_still_reports_the_sent_message() {
    let provider = sample_provider().with_fault(Fault::new(Stage::Receive, "MQRC_GET_INHIBITED"));
    let (outcome, out) = run(&[], &provider).await;
    assert!(!outcome.is_success());
    assert!(out.contains("Sent message:"), "{out}");
    assert!(!out.contains("Received message:"), "{out}");
    let ledger = provider.ledger();
    assert_eq!(ledger.opened(ResourceKind::Consumer), 1);
    assert_eq!(ledger.closed(ResourceKind::Consumer), 1);
    assert_eq!(ledger.closed(ResourceKind::Session), 1);
}

#[tokio::test]
async fn producer_close_failure_still_reports_the_put_message() {
    let provider = sample_provider().with_fault(Fault::new(Stage::Close, "broken"));
    let (outcome, out) = run(&[], &provider).await;

    assert_eq!(outcome.exit_code(), EXIT_FAILURE);
    match &outcome {
        Outcome::Failure(err) => assert_eq!(err.stage(), Stage::Close),
        Outcome::Success { .. } => panic!("close fault ignored:\n{out}"),
    }
    assert!(out.contains("Sent message:\n"), "{out}");
    assert!(out.contains("Your lucky number today is "), "{out}");
    assert!(!out.contains("Received message:"), "{out}");
    assert!(out.ends_with("FAILURE\n"), "{out}");
    assert_eq!(provider.depth("EAU.ISO20OUT.REQUEST.QL.MEBGLBK"), 1);
    assert_eq!(provider.ledger().closed(ResourceKind::Producer), 1);
    assert_eq!(provider.ledger().opened(ResourceKind::Consumer), 0);
}

#[tokio::test]
async fn send_failure_closes_the_producer_without_reporting_a_put() {
    let provider = sample_provider().with_fault(Fault::new(Stage::Send, "MQRC_Q_FULL"));
    let (outcome, out) = run(&[], &provider).await;

    assert!(!outcome.is_success());
    assert!(!out.contains("Sent message:"), "{out}");
    assert!(out.contains("MQRC_Q_FULL"), "{out}");
    assert_eq!(provider.depth("EAU.ISO20OUT.REQUEST.QL.MEBGLBK"), 0);
    assert_eq!(provider.ledger().closed(ResourceKind::Producer), 1);
}

#[tokio::test]
async fn rejected_credentials_fail_at_authentication() {
    let provider = sample_provider();
    let (outcome, out) = run(&["--app-password", "wrong"], &provider).await;
    match outcome {
        Outcome::Failure(err) => assert_eq!(err.stage(), Stage::Authenticate),
        Outcome::Success { .. } => panic!("wrong password accepted"),
    }
    assert!(out.contains("MQRC_NOT_AUTHORIZED (2035)"), "{out}");
    assert!(!out.contains("wrong"), "{out}");
}

#[tokio::test(start_paused = true)]
async fn receive_timeout_is_success_without_message() {
    let provider = sample_provider().discard_sends();
    let started = tokio::time::Instant::now();
    let (outcome, out) = run(&[], &provider).await;

    assert!(started.elapsed() >= Duration::from_millis(15_000));
    match outcome {
        Outcome::Success { received, .. } => assert!(received.is_none()),
        Outcome::Failure(err) => panic!("unexpected failure: {err}"),
    }
    assert!(out.contains("No message received within 15000 ms"), "{out}");
    assert!(out.ends_with("SUCCESS\n"), "{out}");
}

#[tokio::test]
async fn message_already_on_the_queue_is_received_first() {
    let provider = sample_provider();
    provider.enqueue(
        "EAU.ISO20OUT.REQUEST.QL.MEBGLBK",
        TextMessage::new("left over from an earlier run"),
    );
    let (outcome, out) = run(&[], &provider).await;
    match outcome {
        Outcome::Success { received, .. } => {
            assert_eq!(received.as_deref(), Some("left over from an earlier run"))
        }
        Outcome::Failure(err) => panic!("unexpected failure: {err}"),
    }
    assert!(out.contains("Received message:\nleft over from an earlier run\n"));
    assert_eq!(provider.depth("EAU.ISO20OUT.REQUEST.QL.MEBGLBK"), 1);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn password_never_reaches_the_logs() {
    let provider = InMemoryProvider::new();
    let (outcome, out) = run(&["--app-password", "Sup3rS3cret"], &provider).await;
    assert!(outcome.is_success());
    assert!(!out.contains("Sup3rS3cret"));
    assert!(logs_contain("session open"));
    assert!(!logs_contain("Sup3rS3cret"));
}

/// Provider whose consumer never returns from `receive`.
struct StuckProvider;

struct StuckSession;
struct StuckProducer;
struct StuckConsumer;

#[async_trait]
impl ConnectionFactory for StuckProvider {
    async fn create_session(
        &self,
        _props: &ConnectionProperties,
    ) -> Result<Box<dyn Session>, ProviderError> {
        Ok(Box::new(StuckSession))
    }
}

#[async_trait]
impl Session for StuckSession {
    async fn resolve_destination(&self, uri: &str) -> Result<Destination, ProviderError> {
        Destination::parse(uri)
    }

    async fn create_producer(&self) -> Result<Box<dyn Producer>, ProviderError> {
        Ok(Box::new(StuckProducer))
    }

    async fn create_consumer(
        &self,
        _destination: &Destination,
    ) -> Result<Box<dyn Consumer>, ProviderError> {
        Ok(Box::new(StuckConsumer))
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[async_trait]
impl Producer for StuckProducer {
    async fn send(
        &self,
        destination: &Destination,
        message: &mut TextMessage,
    ) -> Result<(), ProviderError> {
        message.stamp(&destination.uri());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[async_trait]
impl Consumer for StuckConsumer {
    async fn receive(&self, _timeout: Duration) -> Result<Option<TextMessage>, ProviderError> {
        std::future::pending().await
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn provider_ignoring_the_timeout_does_not_hang_the_run() {
    let (outcome, out) = run(&["--receive-timeout-ms", "1000"], &StuckProvider).await;
    match outcome {
        Outcome::Success { received, .. } => assert!(received.is_none()),
        Outcome::Failure(err) => panic!("unexpected failure: {err}"),
    }
    assert!(out.contains("No message received within 1000 ms"), "{out}");
}
