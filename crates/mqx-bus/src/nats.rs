//! NATS JetStream realisation of the messaging capability.
//!
//! A queue `Q` of queue manager `QM` is the subject `QM.Q`, captured by a
//! work-queue stream `QM_Q`. Consumers are uniquely named, non-durable pull
//! consumers. They are deleted when closed, and the server drops any left
//! behind by an interrupted run once they have been idle for
//! [`CONSUMER_INACTIVE_THRESHOLD`].

use crate::{ConnectionFactory, Consumer, Producer, Session};
use async_nats::jetstream::{
    self,
    context::PublishError,
    consumer::{AckPolicy, PullConsumer, pull},
    stream::{self, RetentionPolicy},
};
use async_nats::{Client, ConnectError, ConnectErrorKind, ConnectOptions, HeaderMap};
use async_trait::async_trait;
use futures::StreamExt;
use mqx_core::{
    ConnectionProperties, Destination, LinkedError, ProviderError, Stage, TextMessage,
};
use nanoid::nanoid;
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Extra slack on top of the pull expiry before we stop waiting ourselves.
const RECEIVE_GRACE: Duration = Duration::from_millis(500);
/// Idle time after which the server removes a consumer nobody closed. A
/// work-queue stream accepts only one unfiltered consumer at a time.
pub const CONSUMER_INACTIVE_THRESHOLD: Duration = Duration::from_secs(30);

const MESSAGE_ID_HEADER: &str = "Mqx-Message-Id";
const TIMESTAMP_HEADER: &str = "Mqx-Timestamp";
const DESTINATION_HEADER: &str = "Mqx-Destination";

/// Replaces characters that would split or wildcard a subject token.
fn norm(s: &str) -> Cow<'_, str> {
    if s.contains([' ', '\t', '\n', '\r', '*', '>']) {
        Cow::Owned(s.replace([' ', '\t', '\n', '\r', '*', '>'], "-"))
    } else {
        Cow::Borrowed(s)
    }
}

/// ```
/// use mqx_bus::nats::queue_subject;
///
/// assert_eq!(queue_subject("AEQT", "DEV.QUEUE.1"), "AEQT.DEV.QUEUE.1");
/// ```
pub fn queue_subject(queue_manager: &str, queue: &str) -> String {
    format!("{}.{}", norm(queue_manager), norm(queue))
}

/// Stream names may not contain dots or wildcards.
///
/// ```
/// use mqx_bus::nats::stream_name;
///
/// assert_eq!(stream_name("AEQT", "DEV.QUEUE.1"), "AEQT_DEV_QUEUE_1");
/// ```
pub fn stream_name(queue_manager: &str, queue: &str) -> String {
    format!("{queue_manager}_{queue}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// TLS is required as soon as a cipher spec is configured.
pub fn server_url(props: &ConnectionProperties) -> String {
    let scheme = if props.cipher_spec.is_some() {
        "tls"
    } else {
        "nats"
    };
    format!("{scheme}://{}:{}", props.host, props.port)
}

pub fn connection_name(props: &ConnectionProperties) -> String {
    format!("{} [{}]", props.application_name, props.channel)
}

/// Pull consumer settings for one exchange.
pub fn consumer_config(name: &str, destination: &Destination) -> pull::Config {
    pull::Config {
        name: Some(name.to_string()),
        ack_policy: AckPolicy::Explicit,
        inactive_threshold: CONSUMER_INACTIVE_THRESHOLD,
        description: Some(format!("mqx consumer for {destination}")),
        ..Default::default()
    }
}

fn connect_error(props: &ConnectionProperties, err: ConnectError) -> ProviderError {
    let stage = match err.kind() {
        ConnectErrorKind::AuthorizationViolation | ConnectErrorKind::Authentication => {
            Stage::Authenticate
        }
        _ => Stage::Connect,
    };
    ProviderError::new(
        stage,
        format!(
            "unable to reach queue manager '{}' at {}:{} over channel '{}'",
            props.queue_manager, props.host, props.port, props.channel
        ),
    )
    .with_linked(err)
}

#[derive(Debug, Clone)]
pub struct NatsConnectionFactory {
    connect_timeout: Duration,
}

impl Default for NatsConnectionFactory {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl NatsConnectionFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ConnectionFactory for NatsConnectionFactory {
    async fn create_session(
        &self,
        props: &ConnectionProperties,
    ) -> Result<Box<dyn Session>, ProviderError> {
        let mut options = ConnectOptions::new()
            .name(connection_name(props))
            .connection_timeout(self.connect_timeout);
        if let Some(credentials) = &props.credentials {
            options = options.user_and_password(
                credentials.user().to_string(),
                credentials.password().to_string(),
            );
        }
        if let Some(cipher_spec) = &props.cipher_spec {
            warn!(
                cipher_spec = %cipher_spec,
                "tls required, cipher spec not enforced: suite is negotiated by the tls stack"
            );
            options = options.require_tls(true);
        }

        let url = server_url(props);
        let client = options
            .connect(url.as_str())
            .await
            .map_err(|err| connect_error(props, err))?;
        info!(
            url = %url,
            queue_manager = %props.queue_manager,
            mode = props.connection_mode.as_str(),
            "nats session opened"
        );

        Ok(Box::new(NatsSession {
            js: jetstream::new(client.clone()),
            client,
            queue_manager: props.queue_manager.clone(),
        }))
    }
}

struct NatsSession {
    client: Client,
    js: jetstream::Context,
    queue_manager: String,
}

#[async_trait]
impl Session for NatsSession {
    async fn resolve_destination(&self, uri: &str) -> Result<Destination, ProviderError> {
        let destination = Destination::parse(uri)?;
        let name = stream_name(&self.queue_manager, destination.queue());
        let config = stream::Config {
            name: name.clone(),
            subjects: vec![queue_subject(&self.queue_manager, destination.queue())],
            retention: RetentionPolicy::WorkQueue,
            description: Some(format!("mqx queue {destination}")),
            ..Default::default()
        };
        self.js.get_or_create_stream(config).await.map_err(|err| {
            ProviderError::new(
                Stage::ResolveDestination,
                format!("unable to open {destination} (stream {name})"),
            )
            .with_linked(err)
        })?;
        Ok(destination)
    }

    async fn create_producer(&self) -> Result<Box<dyn Producer>, ProviderError> {
        Ok(Box::new(NatsProducer {
            js: self.js.clone(),
            queue_manager: self.queue_manager.clone(),
        }))
    }

    async fn create_consumer(
        &self,
        destination: &Destination,
    ) -> Result<Box<dyn Consumer>, ProviderError> {
        let name = stream_name(&self.queue_manager, destination.queue());
        let stream = self.js.get_stream(&name).await.map_err(|err| {
            ProviderError::new(
                Stage::CreateConsumer,
                format!("stream {name} for {destination} not found"),
            )
            .with_linked(err)
        })?;
        let consumer_name = format!("mqx-{}", nanoid!(12));
        let consumer: PullConsumer = stream
            .create_consumer(consumer_config(&consumer_name, destination))
            .await
            .map_err(|err| {
                ProviderError::new(
                    Stage::CreateConsumer,
                    format!("unable to create consumer on {destination}"),
                )
                .with_linked(err)
            })?;
        debug!(consumer = %consumer_name, stream = %name, "pull consumer created");
        Ok(Box::new(NatsConsumer {
            stream,
            consumer,
            name: consumer_name,
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        self.client.flush().await.map_err(|err| {
            ProviderError::new(Stage::Close, "unable to flush session").with_linked(err)
        })?;
        debug!(queue_manager = %self.queue_manager, "nats session closed");
        Ok(())
    }
}

struct NatsProducer {
    js: jetstream::Context,
    queue_manager: String,
}

#[async_trait]
impl Producer for NatsProducer {
    async fn send(
        &self,
        destination: &Destination,
        message: &mut TextMessage,
    ) -> Result<(), ProviderError> {
        message.stamp(&destination.uri());
        let mut headers = HeaderMap::new();
        if let Some(id) = &message.message_id {
            headers.insert(MESSAGE_ID_HEADER, id.as_str());
        }
        if let Some(ts) = &message.timestamp {
            headers.insert(TIMESTAMP_HEADER, ts.as_str());
        }
        headers.insert(DESTINATION_HEADER, destination.uri().as_str());

        let subject = queue_subject(&self.queue_manager, destination.queue());
        let send_error = |err: PublishError| {
            ProviderError::new(Stage::Send, format!("put to {destination} rejected"))
                .with_linked(err)
        };
        let ack = self
            .js
            .publish_with_headers(subject.clone(), headers, message.body.clone().into())
            .await
            .map_err(send_error)?
            .await
            .map_err(send_error)?;
        debug!(subject = %subject, sequence = ack.sequence, "message acknowledged");
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        Ok(())
    }
}

struct NatsConsumer {
    stream: stream::Stream,
    consumer: PullConsumer,
    name: String,
}

impl NatsConsumer {
    fn receive_error(&self, err: impl Into<LinkedError>) -> ProviderError {
        ProviderError::new(Stage::Receive, format!("receive on {} failed", self.name))
            .with_linked(err)
    }

    fn to_text_message(message: &jetstream::Message) -> Result<TextMessage, ProviderError> {
        let body = String::from_utf8(message.payload.to_vec()).map_err(|err| {
            ProviderError::new(Stage::Receive, "received a non-text message").with_linked(err)
        })?;
        let header = |name: &str| {
            message
                .headers
                .as_ref()
                .and_then(|headers| headers.get(name))
                .map(|value| value.as_str().to_string())
        };
        Ok(TextMessage {
            message_id: header(MESSAGE_ID_HEADER),
            timestamp: header(TIMESTAMP_HEADER),
            destination: header(DESTINATION_HEADER),
            body,
        })
    }
}

#[async_trait]
impl Consumer for NatsConsumer {
    async fn receive(&self, timeout: Duration) -> Result<Option<TextMessage>, ProviderError> {
        let mut batch = self
            .consumer
            .batch()
            .max_messages(1)
            .expires(timeout)
            .messages()
            .await
            .map_err(|err| self.receive_error(err))?;

        let next = match tokio::time::timeout(timeout + RECEIVE_GRACE, batch.next()).await {
            Ok(next) => next,
            Err(_) => None,
        };
        let Some(message) = next else {
            return Ok(None);
        };
        let message = message.map_err(|err| self.receive_error(err))?;
        let text = Self::to_text_message(&message)?;
        message.ack().await.map_err(|err| self.receive_error(err))?;
        Ok(Some(text))
    }

    async fn close(self: Box<Self>) -> Result<(), ProviderError> {
        self.stream
            .delete_consumer(&self.name)
            .await
            .map_err(|err| {
                ProviderError::new(Stage::Close, format!("unable to delete consumer {}", self.name))
                    .with_linked(err)
            })?;
        debug!(consumer = %self.name, "pull consumer deleted");
        Ok(())
    }
}
