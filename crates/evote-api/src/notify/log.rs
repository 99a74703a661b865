//! Simulated SMS delivery: the message is written to the log at `info`.
//!
//! This is the development default. The message body is logged verbatim,
//! verification codes included, since the log is the delivery channel.

use evote_core::PhoneNumber;

use super::{NotificationSink, NotifyError};
use crate::store::BoxFuture;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send<'a>(
        &'a self,
        to: &'a PhoneNumber,
        message: &'a str,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            tracing::info!(to = %to.masked(), body = message, "simulated SMS");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
