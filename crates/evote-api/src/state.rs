//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState holds the [`VerificationService`] (and through it the store,
//! notification sink, code generator, and biometric reference set), the
//! metrics registry, and the validated configuration. It is cheap to clone.

use std::sync::Arc;

use evote_state::BiometricReferenceSet;

use crate::codegen::OsRngCodeGenerator;
use crate::config::AppConfig;
use crate::middleware::ApiMetrics;
use crate::notify::LogSink;
use crate::service::VerificationService;
use crate::store::InMemoryVoterStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VerificationService>,
    pub metrics: ApiMetrics,
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("config", &self.config)
            .finish()
    }
}

impl AppState {
    /// In-memory state with default configuration: records in a
    /// [`InMemoryVoterStore`], codes from the OS RNG, notifications logged,
    /// and the builtin biometric reference set.
    pub fn new() -> Self {
        let config = AppConfig::default();
        let metrics = ApiMetrics::new();
        let service = VerificationService::new(
            Arc::new(InMemoryVoterStore::new()),
            Arc::new(LogSink),
            Arc::new(OsRngCodeGenerator),
            Arc::new(BiometricReferenceSet::builtin()),
            config.service_config(),
            metrics.clone(),
        );
        Self::with_service(service, config)
    }

    /// Wrap an already-assembled service. The metrics registry is the one
    /// the service records into.
    pub fn with_service(service: VerificationService, config: AppConfig) -> Self {
        let metrics = service.metrics().clone();
        Self {
            service: Arc::new(service),
            metrics,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_in_memory() {
        let state = AppState::new();
        assert_eq!(state.service.store_backend(), "memory");
        assert_eq!(state.config.port, 5000);
    }

    #[tokio::test]
    async fn state_metrics_share_the_service_registry() {
        let state = AppState::new();
        state.service.request_code("V1", "555-0100").await.unwrap();
        assert_eq!(state.metrics.outcome_count("request_code", "ok"), 1);
    }
}
