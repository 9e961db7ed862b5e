use crate::catalog::Catalog;
use crate::observability::AppMetrics;
use crate::scoring::ConversationScorer;
use crate::services::call_analysis::CallAnalyzer;
use crate::services::persona_registry::PersonaRegistry;
use crate::services::session::SessionService;
use std::sync::Arc;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// Technique / phrase catalog, read-only after startup
    pub catalog: Arc<Catalog>,
    /// Loaded personas
    pub registry: Arc<PersonaRegistry>,
    /// Stateless scorer for one-off scoring requests
    pub scorer: Arc<ConversationScorer>,
    /// Roleplay sessions
    pub session_service: Arc<dyn SessionService>,
    /// Recorded call analysis
    pub analyzer: Arc<CallAnalyzer>,
    /// Counters exposed at /metrics
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("techniques", &self.catalog.techniques().len())
            .field("personas", &self.registry.len())
            .field("session_service", &"Arc<dyn SessionService>")
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        catalog: Arc<Catalog>,
        registry: Arc<PersonaRegistry>,
        scorer: Arc<ConversationScorer>,
        session_service: Arc<dyn SessionService>,
        analyzer: CallAnalyzer,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            catalog,
            registry,
            scorer,
            session_service,
            analyzer: Arc::new(analyzer),
            metrics,
        }
    }
}
