//! # Service Bootstrap
//!
//! Assembles [`AppState`] from a validated [`AppConfig`] at startup.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Load Reference Set**: the biometric reference samples, from a YAML
//!    or JSON list when a path is configured, else the builtin demo set.
//! 2. **Select Store**: Postgres when a pool is given, else in-memory.
//! 3. **Select Notification Sink**: the SMS webhook when configured, else
//!    the log sink.
//! 4. **Log Banner**: one structured line naming the chosen collaborators.

use std::path::Path;
use std::sync::Arc;

use evote_state::{BiometricReferenceSet, ReferenceSetError};
use sqlx::PgPool;
use url::Url;

use crate::codegen::OsRngCodeGenerator;
use crate::config::AppConfig;
use crate::middleware::ApiMetrics;
use crate::notify::{LogSink, NotificationSink, WebhookSink};
use crate::service::VerificationService;
use crate::state::AppState;
use crate::store::{InMemoryVoterStore, PgVoterStore, VoterStore};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors during service bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Reference set file could not be read.
    #[error("cannot read biometric reference set {path}: {source}")]
    ReferenceSetIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Reference set file is not a list of strings.
    #[error("invalid biometric reference set {path}: {reason}")]
    ReferenceSetParse { path: String, reason: String },

    /// Reference set file parsed but holds no usable samples.
    #[error("unusable biometric reference set {path}: {source}")]
    EmptyReferenceSet {
        path: String,
        #[source]
        source: ReferenceSetError,
    },

    /// SMS webhook URL uses a scheme other than http or https.
    #[error("invalid SMS webhook URL {url}: {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    /// HTTP client for the SMS webhook could not be built.
    #[error("SMS webhook client error: {0}")]
    WebhookClient(String),
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Build the application state from configuration and an optional
/// database pool.
pub fn bootstrap(config: AppConfig, db_pool: Option<PgPool>) -> Result<AppState, BootstrapError> {
    let reference = match &config.biometric_reference_path {
        Some(path) => load_reference_set(path)?,
        None => BiometricReferenceSet::builtin(),
    };

    let store: Arc<dyn VoterStore> = match db_pool {
        Some(pool) => Arc::new(PgVoterStore::new(pool)),
        None => Arc::new(InMemoryVoterStore::new()),
    };

    let reference_samples = reference.len();

    let notifier: Arc<dyn NotificationSink> = match &config.sms_webhook_url {
        Some(url) => Arc::new(webhook_sink(url, &config)?),
        None => Arc::new(LogSink),
    };

    let service = VerificationService::new(
        store,
        notifier,
        Arc::new(OsRngCodeGenerator),
        Arc::new(reference),
        config.service_config(),
        ApiMetrics::new(),
    );

    tracing::info!(
        store = service.store_backend(),
        notifier = if config.sms_webhook_url.is_some() { "webhook" } else { "log" },
        reference_samples,
        otp_ttl_secs = config.otp_ttl.as_secs(),
        "eVote service configured"
    );

    Ok(AppState::with_service(service, config))
}

// ---------------------------------------------------------------------------
// Phase 1: Load Reference Set
// ---------------------------------------------------------------------------

/// Load a biometric reference set from a YAML or JSON list of strings.
pub fn load_reference_set(path: &Path) -> Result<BiometricReferenceSet, BootstrapError> {
    let shown = path.display().to_string();

    let raw = std::fs::read_to_string(path).map_err(|source| BootstrapError::ReferenceSetIo {
        path: shown.clone(),
        source,
    })?;

    let samples: Vec<String> =
        serde_yaml::from_str(&raw).map_err(|e| BootstrapError::ReferenceSetParse {
            path: shown.clone(),
            reason: e.to_string(),
        })?;

    let set = BiometricReferenceSet::from_samples(&samples).map_err(|source| {
        BootstrapError::EmptyReferenceSet {
            path: shown.clone(),
            source,
        }
    })?;

    tracing::info!(path = %shown, samples = set.len(), "biometric reference set loaded");
    Ok(set)
}

// ---------------------------------------------------------------------------
// Phase 3: Notification Sink
// ---------------------------------------------------------------------------

fn webhook_sink(url: &Url, config: &AppConfig) -> Result<WebhookSink, BootstrapError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BootstrapError::InvalidWebhookUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    WebhookSink::new(url.clone(), config.notify_timeout)
        .map_err(|e| BootstrapError::WebhookClient(e.to_string()))
}
