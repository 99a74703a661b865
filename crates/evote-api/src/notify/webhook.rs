//! SMS gateway webhook sink.
//!
//! POSTs `{"to": <phone>, "message": <text>}` as JSON to a configured URL.
//! Any 2xx response counts as delivered.

use std::time::Duration;

use evote_core::PhoneNumber;
use serde::Serialize;
use url::Url;

use super::{NotificationSink, NotifyError};
use crate::store::BoxFuture;

#[derive(Debug, Serialize)]
struct OutboundSms<'a> {
    to: &'a str,
    message: &'a str,
}

/// HTTP client for an SMS gateway.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl WebhookSink {
    /// Build a sink posting to `endpoint` with a per-request timeout.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl NotificationSink for WebhookSink {
    fn send<'a>(
        &'a self,
        to: &'a PhoneNumber,
        message: &'a str,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let body = OutboundSms {
                to: to.as_str(),
                message,
            };
            let response = self
                .client
                .post(self.endpoint.clone())
                .json(&body)
                .send()
                .await
                .map_err(|e| NotifyError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(NotifyError::Rejected(status.as_u16()));
            }
            tracing::debug!(to = %to.masked(), endpoint = %self.endpoint, "SMS handed to gateway");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
