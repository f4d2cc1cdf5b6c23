use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed error linked to a [`ProviderError`].
pub type LinkedError = Box<dyn StdError + Send + Sync + 'static>;

/// Step of an exchange at which the provider failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connect,
    Authenticate,
    ResolveDestination,
    CreateProducer,
    Send,
    CreateConsumer,
    Receive,
    Close,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Connect => "connect",
            Stage::Authenticate => "authenticate",
            Stage::ResolveDestination => "resolve-destination",
            Stage::CreateProducer => "create-producer",
            Stage::Send => "send",
            Stage::CreateConsumer => "create-consumer",
            Stage::Receive => "receive",
            Stage::Close => "close",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any failure surfaced by a messaging provider.
///
/// The linked error (and whatever it links to in turn) is reachable through
/// [`std::error::Error::source`].
///
/// ```
/// use mqx_core::{ProviderError, Stage};
/// use std::error::Error;
///
/// let err = ProviderError::new(Stage::Connect, "queue manager unavailable")
///     .with_linked(std::io::Error::other("connection refused"));
/// assert_eq!(err.to_string(), "connect failed: queue manager unavailable");
/// assert_eq!(err.source().unwrap().to_string(), "connection refused");
/// ```
#[derive(Debug, Error)]
#[error("{stage} failed: {message}")]
pub struct ProviderError {
    stage: Stage,
    message: String,
    #[source]
    linked: Option<LinkedError>,
}

impl ProviderError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            linked: None,
        }
    }

    pub fn with_linked(mut self, linked: impl Into<LinkedError>) -> Self {
        self.linked = Some(linked.into());
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn linked(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.linked.as_deref()
    }

    /// Linked causes in order, outermost first.
    pub fn causes(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut next = self.source();
        while let Some(cause) = next {
            out.push(cause.to_string());
            next = cause.source();
        }
        out
    }
}

/// A plain message with an optional cause, for providers that only carry
/// text diagnostics.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CauseChain {
    message: String,
    #[source]
    cause: Option<Box<CauseChain>>,
}

impl CauseChain {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Builds a chain from messages, outermost first. Returns `None` when empty.
    ///
    /// ```
    /// use mqx_core::CauseChain;
    /// use std::error::Error;
    ///
    /// let chain = CauseChain::from_messages(["outer", "inner"]).unwrap();
    /// assert_eq!(chain.to_string(), "outer");
    /// assert_eq!(chain.source().unwrap().to_string(), "inner");
    /// ```
    pub fn from_messages<I, S>(messages: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: DoubleEndedIterator,
        S: Into<String>,
    {
        messages.into_iter().rev().fold(None, |cause, message| {
            Some(CauseChain {
                message: message.into(),
                cause: cause.map(Box::new),
            })
        })
    }
}
