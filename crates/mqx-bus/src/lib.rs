//! The messaging capability an exchange is run against.
//!
//! A [`ConnectionFactory`] opens a [`Session`]; the session resolves
//! destinations and hands out a [`Producer`] and a [`Consumer`]. Every handle is
//! released by consuming it through `close`, so a handle cannot be closed twice.

use async_trait::async_trait;
use mqx_core::{ConnectionProperties, Destination, ProviderError, TextMessage};
use std::time::Duration;

pub mod memory;
pub mod nats;

pub use memory::{Fault, InMemoryProvider, ResourceKind, ResourceLedger};
pub use nats::NatsConnectionFactory;

#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn create_session(
        &self,
        props: &ConnectionProperties,
    ) -> Result<Box<dyn Session>, ProviderError>;
}

#[async_trait]
pub trait Session: Send + Sync {
    /// Maps a `queue:///NAME` URI to a destination known to the provider.
    async fn resolve_destination(&self, uri: &str) -> Result<Destination, ProviderError>;

    async fn create_producer(&self) -> Result<Box<dyn Producer>, ProviderError>;

    async fn create_consumer(
        &self,
        destination: &Destination,
    ) -> Result<Box<dyn Consumer>, ProviderError>;

    async fn close(self: Box<Self>) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait Producer: Send + Sync {
    /// Returns once the provider accepted the message. Stamps id and timestamp.
    async fn send(
        &self,
        destination: &Destination,
        message: &mut TextMessage,
    ) -> Result<(), ProviderError>;

    async fn close(self: Box<Self>) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait Consumer: Send + Sync {
    /// Waits at most `timeout`; `Ok(None)` when nothing arrived.
    async fn receive(&self, timeout: Duration) -> Result<Option<TextMessage>, ProviderError>;

    async fn close(self: Box<Self>) -> Result<(), ProviderError>;
}
