//! # Notification Sinks
//!
//! Outbound messages to voters: the verification code after request-code
//! and a confirmation after a vote is recorded.
//!
//! Delivery is best-effort. The service dispatches on a spawned task after
//! the state change is committed, bounds each send with a timeout, and only
//! logs failures. A sink error never fails a request.
//!
//! | Sink | Use |
//! |------|-----|
//! | [`LogSink`] | Simulated SMS: writes the message to the log |
//! | [`WebhookSink`] | POSTs `{to, message}` to an SMS gateway |
//! | [`MemorySink`] | Captures messages in memory for tests |

pub mod log;
pub mod memory;
pub mod webhook;

use evote_core::PhoneNumber;
use thiserror::Error;

pub use self::log::LogSink;
pub use self::memory::{MemorySink, SentMessage};
pub use self::webhook::WebhookSink;

use crate::store::BoxFuture;

/// Delivery failures. Logged, never surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The gateway could not be reached.
    #[error("notification transport error: {0}")]
    Transport(String),

    /// The gateway answered with a non-success status.
    #[error("notification gateway rejected message with status {0}")]
    Rejected(u16),
}

/// Fire-and-forget message delivery to a voter's phone.
pub trait NotificationSink: Send + Sync {
    /// Deliver `message` to `to`.
    fn send<'a>(
        &'a self,
        to: &'a PhoneNumber,
        message: &'a str,
    ) -> BoxFuture<'a, Result<(), NotifyError>>;

    /// Short sink name for logs.
    fn name(&self) -> &'static str;
}

/// Text of the verification code message.
pub fn code_message(code: &str) -> String {
    format!("Your voting verification code is {code}")
}

/// Text of the vote confirmation message.
pub fn vote_confirmation_message(choice: &str) -> String {
    format!("Your vote for {choice} has been recorded")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_message_contains_code() {
        assert!(code_message("123456").contains("123456"));
    }

    #[test]
    fn confirmation_names_choice() {
        assert_eq!(
            vote_confirmation_message("PartyA"),
            "Your vote for PartyA has been recorded"
        );
    }
}
