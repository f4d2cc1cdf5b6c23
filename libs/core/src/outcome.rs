use crate::error::ProviderError;
use crate::message::TextMessage;

/// Exit status of a successful exchange.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status of a failed exchange.
pub const EXIT_FAILURE: i32 = -1;
/// Exit status when the process ends before any outcome was recorded.
pub const EXIT_UNSET: i32 = 1;

/// Result of one send-then-receive exchange.
#[derive(Debug)]
pub enum Outcome {
    Success {
        sent: TextMessage,
        /// `None` when nothing arrived within the receive timeout.
        received: Option<String>,
    },
    Failure(ProviderError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// ```
    /// use mqx_core::{Outcome, ProviderError, Stage, TextMessage};
    ///
    /// let ok = Outcome::Success { sent: TextMessage::new("hi"), received: None };
    /// assert_eq!(ok.exit_code(), 0);
    /// let failed = Outcome::Failure(ProviderError::new(Stage::Send, "rejected"));
    /// assert_eq!(failed.exit_code(), -1);
    /// ```
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success { .. } => EXIT_SUCCESS,
            Outcome::Failure(_) => EXIT_FAILURE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::Failure(_) => "failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_code_differs_from_unset() {
        assert_ne!(EXIT_FAILURE, EXIT_UNSET);
        assert_ne!(EXIT_SUCCESS, EXIT_UNSET);
    }
}
