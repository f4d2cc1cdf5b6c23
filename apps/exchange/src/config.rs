use clap::ValueEnum;
use mqx_bus::{ConnectionFactory, InMemoryProvider, NatsConnectionFactory};
use mqx_core::{ConnectionProperties, DEFAULT_QUEUE, DEFAULT_RECEIVE_TIMEOUT, queue_uri};
use std::time::Duration;

/// Which messaging provider realises the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// NATS JetStream server at HOST:PORT.
    #[default]
    Nats,
    /// In-process loopback queues; no server needed.
    Memory,
}

impl ProviderKind {
    pub fn factory(&self) -> Box<dyn ConnectionFactory> {
        match self {
            ProviderKind::Nats => Box::new(NatsConnectionFactory::default()),
            ProviderKind::Memory => Box::new(InMemoryProvider::new()),
        }
    }
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub connection: ConnectionProperties,
    pub queue: String,
    pub receive_timeout: Duration,
    pub provider: ProviderKind,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionProperties::default(),
            queue: DEFAULT_QUEUE.to_string(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            provider: ProviderKind::Nats,
        }
    }
}

impl ExchangeConfig {
    pub fn destination_uri(&self) -> String {
        queue_uri(&self.queue)
    }
}
