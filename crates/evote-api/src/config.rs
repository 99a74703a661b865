//! # Server Configuration
//!
//! Command-line flags with environment fallbacks, parsed by `clap`. The
//! binary parses [`ServerArgs`] and converts them into an [`AppConfig`],
//! which is what the rest of the crate consumes.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use evote_state::CodePolicy;
use thiserror::Error;
use url::Url;

use crate::service::ServiceConfig;

/// Errors from validating parsed arguments.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration setting was zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    /// The SMS webhook URL did not parse.
    #[error("invalid SMS webhook URL {url:?}: {reason}")]
    InvalidWebhookUrl { url: String, reason: String },
}

/// eVote API server.
///
/// Issues one-time codes, verifies codes and biometric samples, and records
/// at most one vote per voter.
#[derive(Parser, Debug, Clone)]
#[command(name = "evote-api", version, about, long_about = None)]
pub struct ServerArgs {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Postgres connection URL. Records are kept in memory when absent.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// YAML or JSON list of accepted biometric samples. The builtin demo
    /// set is used when absent.
    #[arg(long, env = "BIOMETRIC_REFERENCE_PATH")]
    pub biometric_reference_path: Option<PathBuf>,

    /// SMS gateway endpoint. Messages are only logged when absent.
    #[arg(long, env = "SMS_WEBHOOK_URL")]
    pub sms_webhook_url: Option<String>,

    /// Seconds an issued code stays valid.
    #[arg(long, env = "OTP_TTL_SECS", default_value_t = 600)]
    pub otp_ttl_secs: u64,

    /// Upper bound on a single store call, in milliseconds.
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 2000)]
    pub store_timeout_ms: u64,

    /// Upper bound on a single notification send, in milliseconds.
    #[arg(long, env = "NOTIFY_TIMEOUT_MS", default_value_t = 3000)]
    pub notify_timeout_ms: u64,

    /// Serve `/metrics` and record request metrics.
    #[arg(long, env = "EVOTE_METRICS_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub metrics_enabled: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "EVOTE_LOG_JSON", default_value_t = false, action = clap::ArgAction::Set)]
    pub log_json: bool,
}

impl ServerArgs {
    /// Validate and convert into an [`AppConfig`].
    pub fn into_config(self) -> Result<AppConfig, ConfigError> {
        let otp_ttl = nonzero_secs(self.otp_ttl_secs, "otp_ttl_secs")?;
        let store_timeout = nonzero_millis(self.store_timeout_ms, "store_timeout_ms")?;
        let notify_timeout = nonzero_millis(self.notify_timeout_ms, "notify_timeout_ms")?;

        let sms_webhook_url = self
            .sms_webhook_url
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidWebhookUrl {
                    url: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(AppConfig {
            port: self.port,
            database_url: self.database_url.filter(|url| !url.trim().is_empty()),
            biometric_reference_path: self.biometric_reference_path,
            sms_webhook_url,
            otp_ttl,
            store_timeout,
            notify_timeout,
            metrics_enabled: self.metrics_enabled,
            log_json: self.log_json,
        })
    }
}

fn nonzero_secs(value: u64, field: &'static str) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroDuration { field });
    }
    Ok(Duration::from_secs(value))
}

fn nonzero_millis(value: u64, field: &'static str) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroDuration { field });
    }
    Ok(Duration::from_millis(value))
}

/// Validated application configuration.
///
/// Custom `Debug` implementation redacts the database URL, which may carry
/// credentials.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub biometric_reference_path: Option<PathBuf>,
    pub sms_webhook_url: Option<Url>,
    pub otp_ttl: Duration,
    pub store_timeout: Duration,
    pub notify_timeout: Duration,
    pub metrics_enabled: bool,
    pub log_json: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("biometric_reference_path", &self.biometric_reference_path)
            .field("sms_webhook_url", &self.sms_webhook_url.as_ref().map(Url::as_str))
            .field("otp_ttl", &self.otp_ttl)
            .field("store_timeout", &self.store_timeout)
            .field("notify_timeout", &self.notify_timeout)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl AppConfig {
    /// Service tunables derived from this configuration.
    pub fn service_config(&self) -> ServiceConfig {
        let ttl = chrono::Duration::from_std(self.otp_ttl)
            .unwrap_or_else(|_| CodePolicy::default().ttl);
        ServiceConfig {
            code_policy: CodePolicy { ttl },
            store_timeout: self.store_timeout,
            notify_timeout: self.notify_timeout,
            ..ServiceConfig::default()
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self {
            port: 5000,
            database_url: None,
            biometric_reference_path: None,
            sms_webhook_url: None,
            otp_ttl: service
                .code_policy
                .ttl
                .to_std()
                .unwrap_or(Duration::from_secs(600)),
            store_timeout: service.store_timeout,
            notify_timeout: service.notify_timeout,
            metrics_enabled: true,
            log_json: false,
        }
    }
}
