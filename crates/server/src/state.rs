use std::sync::Arc;
use triage_core::{Authenticator, Config, SanitizedConfig, TicketService, TriageScheduler};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    service: TicketService,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        service: TicketService,
    ) -> Self {
        Self {
            config,
            authenticator,
            service,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn service(&self) -> &TicketService {
        &self.service
    }

    pub fn scheduler(&self) -> &TriageScheduler {
        self.service.scheduler()
    }
}
