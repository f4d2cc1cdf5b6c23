//! Console report of an exchange, including the linked-cause dump of failures.

use crate::config::ExchangeConfig;
use mqx_core::{EXIT_FAILURE, EXIT_SUCCESS, Outcome, ProviderError, TextMessage};
use std::fmt::Display;
use std::io::Write;
use std::time::Duration;
use tracing::warn;

/// Line-oriented sink for the human-readable report.
///
/// Write failures are logged and otherwise ignored; they never change the
/// outcome of an exchange.
pub struct Console<W: Write> {
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn line(&mut self, text: impl Display) {
        if let Err(err) = writeln!(self.out, "{text}") {
            warn!(error = %err, "console write failed");
        }
    }

    pub fn flush(&mut self) {
        if let Err(err) = self.out.flush() {
            warn!(error = %err, "console flush failed");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn print_summary<W: Write>(console: &mut Console<W>, config: &ExchangeConfig) {
    let conn = &config.connection;
    console.line(format_args!("Host: {} : port: {}", conn.host, conn.port));
    console.line(format_args!(
        "Channel: {} : queue manager: {} : queue: {}",
        conn.channel, conn.queue_manager, config.queue
    ));
    match &conn.credentials {
        Some(creds) => console.line(format_args!("Authentication: user '{}'", creds.user())),
        None => console.line("Authentication: disabled"),
    }
    if let Some(cipher_spec) = &conn.cipher_spec {
        console.line(format_args!("TLS cipher spec: {cipher_spec}"));
    }
}

pub fn print_sent<W: Write>(console: &mut Console<W>, message: &TextMessage) {
    console.line("Sent message:");
    console.line(message);
}

pub fn print_received<W: Write>(
    console: &mut Console<W>,
    body: Option<&str>,
    timeout: Duration,
) {
    console.line("");
    match body {
        Some(body) => {
            console.line("Received message:");
            console.line(body);
        }
        None => console.line(format_args!(
            "No message received within {} ms",
            timeout.as_millis()
        )),
    }
}

pub fn record_success<W: Write>(console: &mut Console<W>) -> i32 {
    console.line("SUCCESS");
    EXIT_SUCCESS
}

/// Prints the error, then every linked cause in order, then `FAILURE`.
pub fn record_failure<W: Write>(console: &mut Console<W>, err: &ProviderError) -> i32 {
    console.line(err);
    let causes = err.causes();
    if !causes.is_empty() {
        console.line("Inner exception(s):");
    }
    for cause in &causes {
        console.line(cause);
    }
    console.line("FAILURE");
    EXIT_FAILURE
}

pub fn report_outcome<W: Write>(console: &mut Console<W>, outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Success { .. } => record_success(console),
        Outcome::Failure(err) => record_failure(console, err),
    }
}
