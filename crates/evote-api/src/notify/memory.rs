//! In-memory sink that records every message it is asked to deliver.

use std::sync::Arc;

use evote_core::PhoneNumber;
use parking_lot::Mutex;

use super::{NotificationSink, NotifyError};
use crate::store::BoxFuture;

/// A captured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub message: String,
}

/// Capturing sink. Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    outbox: Arc<Mutex<Vec<SentMessage>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured messages, oldest first.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.outbox.lock().clone()
    }

    /// Most recent message sent to `phone`.
    pub fn last_to(&self, phone: &str) -> Option<SentMessage> {
        self.outbox
            .lock()
            .iter()
            .rev()
            .find(|m| m.to == phone)
            .cloned()
    }

    /// Most recent verification code sent to `phone`: the trailing run of
    /// digits in the last message.
    pub fn last_code_to(&self, phone: &str) -> Option<String> {
        let msg = self.last_to(phone)?;
        let code: String = msg
            .message
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        (!code.is_empty()).then_some(code)
    }
}

impl NotificationSink for MemorySink {
    fn send<'a>(
        &'a self,
        to: &'a PhoneNumber,
        message: &'a str,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            self.outbox.lock().push(SentMessage {
                to: to.as_str().to_string(),
                message: message.to_string(),
            });
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::code_message;
    use evote_state::{OneTimeCode, CODE_MAX, CODE_MIN};
    use proptest::prelude::*;

    #[tokio::test]
    async fn captures_and_extracts_code() {
        let sink = MemorySink::new();
        let phone = PhoneNumber::new("555-0100").unwrap();
        sink.send(&phone, &code_message("482913")).await.unwrap();
        assert_eq!(sink.messages().len(), 1);
        assert_eq!(sink.last_code_to("555-0100").as_deref(), Some("482913"));
        assert_eq!(sink.last_code_to("555-0199"), None);
    }

    #[tokio::test]
    async fn last_to_returns_latest() {
        let sink = MemorySink::new();
        let phone = PhoneNumber::new("555-0100").unwrap();
        sink.send(&phone, &code_message("111111")).await.unwrap();
        sink.send(&phone, &code_message("222222")).await.unwrap();
        assert_eq!(sink.last_code_to("555-0100").as_deref(), Some("222222"));
    }

    proptest! {
        #[test]
        fn any_issued_code_is_recoverable(value in CODE_MIN..=CODE_MAX) {
            let code = OneTimeCode::from_value(value).unwrap();
            let sink = MemorySink::new();
            sink.outbox.lock().push(SentMessage {
                to: "555-0100".into(),
                message: code_message(code.expose()),
            });
            let recovered = sink.last_code_to("555-0100");
            prop_assert_eq!(recovered.as_deref(), Some(code.expose()));
        }
    }
}
