//! Loopback provider keeping queues in process memory.
//!
//! Besides serving `--provider memory`, it records every connection request,
//! keeps a ledger of opened/closed handles and lets callers inject a provider
//! failure at any stage.

use crate::{ConnectionFactory, Consumer, Producer, Session};
use async_trait::async_trait;
use mqx_core::{
    CauseChain, ConnectionProperties, Credentials, Destination, ProviderError, Stage, TextMessage,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Session,
    Producer,
    Consumer,
}

/// Open/close counts per handle kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLedger {
    opened: HashMap<ResourceKind, usize>,
    closed: HashMap<ResourceKind, usize>,
}

impl ResourceLedger {
    pub fn opened(&self, kind: ResourceKind) -> usize {
        self.opened.get(&kind).copied().unwrap_or(0)
    }

    pub fn closed(&self, kind: ResourceKind) -> usize {
        self.closed.get(&kind).copied().unwrap_or(0)
    }

    /// True when every opened handle was closed exactly once.
    pub fn all_released(&self) -> bool {
        [
            ResourceKind::Session,
            ResourceKind::Producer,
            ResourceKind::Consumer,
        ]
        .iter()
        .all(|kind| self.opened(*kind) == self.closed(*kind))
    }

    fn open(&mut self, kind: ResourceKind) {
        *self.opened.entry(kind).or_default() += 1;
    }

    fn close(&mut self, kind: ResourceKind) {
        *self.closed.entry(kind).or_default() += 1;
    }
}

/// A failure to raise when the exchange reaches `stage`.
#[derive(Debug, Clone)]
pub struct Fault {
    stage: Stage,
    message: String,
    causes: Vec<String>,
}

impl Fault {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Appends a linked cause; causes are reported in the order added.
    pub fn caused_by(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn to_error(&self) -> ProviderError {
        let err = ProviderError::new(self.stage, self.message.clone());
        match CauseChain::from_messages(self.causes.clone()) {
            Some(chain) => err.with_linked(chain),
            None => err,
        }
    }
}

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<TextMessage>>,
    connections: Vec<ConnectionProperties>,
    ledger: ResourceLedger,
    faults: HashMap<Stage, Fault>,
    required_credentials: Option<Credentials>,
    discard_sends: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryProvider {
    state: Arc<Mutex<State>>,
    arrivals: Arc<Notify>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(self, fault: Fault) -> Self {
        self.lock().faults.insert(fault.stage, fault);
        self
    }

    /// Rejects sessions whose credentials differ (or are absent).
    pub fn require_credentials(self, credentials: Credentials) -> Self {
        self.lock().required_credentials = Some(credentials);
        self
    }

    /// Accept sends without enqueueing, so receives run into their timeout.
    pub fn discard_sends(self) -> Self {
        self.lock().discard_sends = true;
        self
    }

    pub fn enqueue(&self, queue: &str, message: TextMessage) {
        self.lock()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(message);
        self.arrivals.notify_waiters();
    }

    pub fn depth(&self, queue: &str) -> usize {
        self.lock().queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Properties of every session requested so far, in order.
    pub fn connections(&self) -> Vec<ConnectionProperties> {
        self.lock().connections.clone()
    }

    pub fn ledger(&self) -> ResourceLedger {
        self.lock().ledger.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, stage: Stage) -> Result<(), ProviderError> {
        match self.lock().faults.get(&stage) {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }

    fn pop(&self, queue: &str) -> Option<TextMessage> {
        self.lock().queues.get_mut(queue).and_then(VecDeque::pop_front)
    }

    fn release(&self, kind: ResourceKind) -> Result<(), ProviderError> {
        self.lock().ledger.close(kind);
        debug!(?kind, "memory handle closed");
        self.check(Stage::Close)
    }
}

#[async_trait]
impl ConnectionFactory for InMemoryProvider {
    async fn create_session(
        &self,
        props: &ConnectionProperties,
    ) -> Result<Box<dyn Session>, ProviderError> {
        self.lock().connections.push(props.clone());
        self.check(Stage::Connect)?;

        let required = self.lock().required_credentials.clone();
        if let Some(required) = required {
            if props.credentials.as_ref() != Some(&required) {
                let user = props
                    .credentials
                    .as_ref()
                    .map(|c| c.user().to_string())
                    .unwrap_or_default();
                return Err(ProviderError::new(
                    Stage::Authenticate,
                    format!(
                        "queue manager '{}' rejected user '{user}'",
                        props.queue_manager
                    ),
                )
                .with_linked(CauseChain::new("MQRC_NOT_AUTHORIZED (2035)")));
            }
        }
        self.check(Stage::Authenticate)?;

        self.lock().ledger.open(ResourceKind::Session);
        debug!(queue_manager = %props.queue_manager, "memory session opened");
        Ok(Box::new(MemorySession {
            provider: self.clone(),
        }))
    }
}

struct MemorySession {
    provider: InMemoryProvider,
}

#[async_trait]
impl Session for MemorySession {
    async fn resolve_destination(&self, uri: &str) -> Result<Destination, ProviderError> {
        self.provider.check(Stage::ResolveDestination)?;
        let destination = Destination::parse(uri)?;
        self.provider
            .lock()
            .queues
            .entry(destination.queue().to_string())
            .or_default();
        Ok(destination)
    }

    async fn create_producer(&self) -> Result<Box<dyn Producer>, ProviderError> {
        self.provider.check(Stage::CreateProducer)?;
        self.provider.lock().ledger.open(ResourceKind::Producer);
        Ok(Box::new(MemoryProducer {
            provider: self.provider.clone(),
        }))
    }

    async fn create_consumer(
        &self,
        destination: &Destination,
    ) -> Result<Box<dyn Consumer>, ProviderError> {
        self.provider.check(Stage::CreateConsumer)?;
        self.provider.lock().ledger.open(ResourceKind::Consumer);
        Ok(Box::new(MemoryConsumer {
            provider: self.provider.clone(),
            queue: destination.queue().to_string(),
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        self.provider.release(ResourceKind::Session)
    }
}

struct MemoryProducer {
    provider: InMemoryProvider,
}

#[async_trait]
impl Producer for MemoryProducer {
    async fn send(
        &self,
        destination: &Destination,
        message: &mut TextMessage,
    ) -> Result<(), ProviderError> {
        self.provider.check(Stage::Send)?;
        message.stamp(&destination.uri());
        if self.provider.lock().discard_sends {
            debug!(queue = %destination.queue(), "memory send discarded");
            return Ok(());
        }
        self.provider.enqueue(destination.queue(), message.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        self.provider.release(ResourceKind::Producer)
    }
}

struct MemoryConsumer {
    provider: InMemoryProvider,
    queue: String,
}

impl MemoryConsumer {
    async fn next_message(&self) -> TextMessage {
        loop {
            let notified = self.provider.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(message) = self.provider.pop(&self.queue) {
                return message;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Consumer for MemoryConsumer {
    async fn receive(&self, timeout: Duration) -> Result<Option<TextMessage>, ProviderError> {
        self.provider.check(Stage::Receive)?;
        Ok(tokio::time::timeout(timeout, self.next_message())
            .await
            .ok())
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        self.provider.release(ResourceKind::Consumer)
    }
}
