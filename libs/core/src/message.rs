use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// A text message as exchanged through a destination.
///
/// `message_id` and `timestamp` are stamped by the provider on send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub body: String,
}

impl TextMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            message_id: None,
            timestamp: None,
            destination: None,
            body: body.into(),
        }
    }

    /// Message with a pseudo-random number derived from the wall clock.
    ///
    /// ```
    /// use mqx_core::TextMessage;
    ///
    /// let msg = TextMessage::lucky_number();
    /// assert!(msg.body.starts_with("Your lucky number today is "));
    /// ```
    pub fn lucky_number() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        Self::new(lucky_number_text(millis))
    }

    /// Assigns a fresh id and the current timestamp, as providers do on send.
    pub fn stamp(&mut self, destination: &str) {
        self.message_id = Some(format!("ID:{}", Uuid::new_v4().simple()));
        self.timestamp = Some(
            OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_else(|_| "1970-01-01T00:00:00Z".into()),
        );
        self.destination = Some(destination.to_string());
    }
}

pub fn lucky_number_text(epoch_millis: u128) -> String {
    format!("Your lucky number today is {}", epoch_millis % 1000)
}

impl fmt::Display for TextMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unset = "<unset>";
        writeln!(f, "  MessageType:  text")?;
        writeln!(
            f,
            "  MessageId:    {}",
            self.message_id.as_deref().unwrap_or(unset)
        )?;
        writeln!(
            f,
            "  Timestamp:    {}",
            self.timestamp.as_deref().unwrap_or(unset)
        )?;
        writeln!(
            f,
            "  Destination:  {}",
            self.destination.as_deref().unwrap_or(unset)
        )?;
        write!(f, "{}", self.body)
    }
}
