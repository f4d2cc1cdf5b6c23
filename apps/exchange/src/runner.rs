use crate::config::ExchangeConfig;
use crate::report::{self, Console};
use mqx_bus::{ConnectionFactory, Session};
use mqx_core::{Outcome, ProviderError, TextMessage};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{Instrument, info, info_span, warn};

/// Slack granted to a provider beyond the receive timeout before the runner
/// gives up waiting on its own.
const RECEIVE_GUARD: Duration = Duration::from_secs(2);

/// Runs exactly one send-then-receive exchange against a provider.
pub struct ExchangeRunner<'a> {
    config: &'a ExchangeConfig,
    factory: &'a dyn ConnectionFactory,
}

impl<'a> ExchangeRunner<'a> {
    pub fn new(config: &'a ExchangeConfig, factory: &'a dyn ConnectionFactory) -> Self {
        Self { config, factory }
    }

    /// Prints the configuration summary, performs the exchange and reports
    /// the terminal `SUCCESS` / `FAILURE` line.
    pub async fn run<W: Write>(&self, console: &mut Console<W>) -> Outcome {
        report::print_summary(console, self.config);

        let conn = &self.config.connection;
        let span = info_span!(
            "exchange",
            host = %conn.host,
            port = conn.port,
            channel = %conn.channel,
            queue_manager = %conn.queue_manager,
            queue = %self.config.queue,
        );
        let started = Instant::now();
        let outcome = match self.exchange(console).instrument(span).await {
            Ok((sent, received)) => {
                mqx_telemetry::record_round_trip(started.elapsed());
                Outcome::Success { sent, received }
            }
            Err(err) => {
                warn!(stage = %err.stage(), error = %err, "exchange failed");
                mqx_telemetry::record_provider_error(err.stage().as_str());
                Outcome::Failure(err)
            }
        };
        mqx_telemetry::record_exchange(outcome.as_str());
        report::report_outcome(console, &outcome);
        console.flush();
        outcome
    }

    async fn exchange<W: Write>(
        &self,
        console: &mut Console<W>,
    ) -> Result<(TextMessage, Option<String>), ProviderError> {
        let session = self
            .factory
            .create_session(&self.config.connection)
            .await?;
        info!(
            authenticated = self.config.connection.authentication_enabled(),
            tls = self.config.connection.cipher_spec.is_some(),
            "session open"
        );
        let result = self.with_session(session.as_ref(), console).await;
        release("session", session.close().await, result)
    }

    async fn with_session<W: Write>(
        &self,
        session: &dyn Session,
        console: &mut Console<W>,
    ) -> Result<(TextMessage, Option<String>), ProviderError> {
        let destination = session
            .resolve_destination(&self.config.destination_uri())
            .await?;
        info!(destination = %destination, "destination resolved");

        let mut message = TextMessage::lucky_number();
        let producer = session.create_producer().await?;
        let sent = producer.send(&destination, &mut message).await;
        if sent.is_ok() {
            // The put has happened; report it even if the producer fails to close.
            info!(message_id = message.message_id.as_deref().unwrap_or_default(), "message sent");
            report::print_sent(console, &message);
        }
        release("producer", producer.close().await, sent)?;

        let timeout = self.config.receive_timeout;
        let consumer = session.create_consumer(&destination).await?;
        let received = match tokio::time::timeout(timeout + RECEIVE_GUARD, consumer.receive(timeout))
            .await
        {
            Ok(received) => received,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "provider ignored receive timeout");
                Ok(None)
            }
        };
        let received = release("consumer", consumer.close().await, received)?;
        let body = received.map(|message| message.body);
        match &body {
            Some(_) => info!("message received"),
            None => info!(timeout_ms = timeout.as_millis() as u64, "no message within timeout"),
        }
        report::print_received(console, body.as_deref(), timeout);

        Ok((message, body))
    }
}

/// Combines the result of a step with the release of the handle it used.
/// An earlier error wins over a release error.
fn release<T>(
    handle: &'static str,
    closed: Result<(), ProviderError>,
    result: Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(handle, error = %close_err, "release failed after earlier error");
            Err(err)
        }
    }
}
