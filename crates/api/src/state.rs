use std::sync::Arc;
use std::time::Duration;

use fairchance_core::gateway::PersistenceGateway;
use fairchance_core::profile::ProfileDirectory;

use crate::config::ServerConfig;
use crate::sessions::AssessmentSessions;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Assessment and step record storage.
    pub gateway: Arc<dyn PersistenceGateway>,
    /// Candidate and HR admin profile lookup.
    pub profiles: Arc<dyn ProfileDirectory>,
    /// Per-subject state machines.
    pub sessions: Arc<AssessmentSessions>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        profiles: Arc<dyn ProfileDirectory>,
        config: ServerConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(AssessmentSessions::new(
                Arc::clone(&gateway),
                Duration::from_secs(config.session_idle_secs),
            )),
            gateway,
            profiles,
            config: Arc::new(config),
        }
    }
}
