//! Queue destinations addressed by `queue:///NAME` URIs.

use crate::error::{ProviderError, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const QUEUE_URI_SCHEME: &str = "queue:///";

/// Builds the URI form of a queue name.
///
/// ```
/// use mqx_core::queue_uri;
///
/// assert_eq!(queue_uri("DEV.QUEUE.1"), "queue:///DEV.QUEUE.1");
/// ```
pub fn queue_uri(queue: &str) -> String {
    format!("{QUEUE_URI_SCHEME}{}", queue.trim())
}

/// A resolved queue handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Destination {
    queue: String,
}

impl Destination {
    /// Parses `queue:///NAME` (or a bare `NAME`) into a destination.
    ///
    /// ```
    /// use mqx_core::Destination;
    ///
    /// let dest = Destination::parse("queue:///DEV.QUEUE.1").unwrap();
    /// assert_eq!(dest.queue(), "DEV.QUEUE.1");
    /// assert!(Destination::parse("queue:///").is_err());
    /// ```
    pub fn parse(uri: &str) -> Result<Self, ProviderError> {
        let trimmed = uri.trim();
        let name = trimmed.strip_prefix(QUEUE_URI_SCHEME).unwrap_or(trimmed);
        // Query parameters (e.g. `?persistence=2`) carry provider options we ignore.
        let name = name.split('?').next().unwrap_or_default();
        if name.is_empty() {
            return Err(ProviderError::new(
                Stage::ResolveDestination,
                format!("no queue name in destination '{uri}'"),
            ));
        }
        if name.contains("://") || name.chars().any(char::is_whitespace) {
            return Err(ProviderError::new(
                Stage::ResolveDestination,
                format!("invalid queue name in destination '{uri}'"),
            ));
        }
        Ok(Self {
            queue: name.to_string(),
        })
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn uri(&self) -> String {
        queue_uri(&self.queue)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{QUEUE_URI_SCHEME}{}", self.queue)
    }
}
