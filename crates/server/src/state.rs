use std::sync::Arc;
use dhtinfo_core::{CacheOrchestrator, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<CacheOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<CacheOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &CacheOrchestrator {
        self.orchestrator.as_ref()
    }
}
