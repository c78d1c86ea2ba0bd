//! Authentication dispatch
//!
//! Entry point for credential checks: pick a server from the current
//! availability snapshot and hand the request to the provider.

use crate::config::{Config, ConfigError};
use crate::error::AuthError;
use crate::monitor::{HealthMonitor, seed_all_available};
use crate::provider::{AuthOutcome, AuthProvider, CredentialRequest, build_provider};
use crate::registry::{AvailabilityRegistry, StatusReport};
use crate::selection::pick_server;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Gateway {
    provider: Arc<dyn AuthProvider>,
    registry: Arc<AvailabilityRegistry>,
}

impl Gateway {
    pub fn new(provider: Arc<dyn AuthProvider>, registry: Arc<AvailabilityRegistry>) -> Self {
        Gateway { provider, registry }
    }

    /// Build the configured provider and start availability tracking
    ///
    /// With health checks enabled the monitor is spawned and its handle
    /// returned; otherwise every server is marked available once.
    pub fn launch(
        config: &Config,
        token: CancellationToken,
    ) -> Result<(Gateway, Option<JoinHandle<()>>), ConfigError> {
        let servers = config.server_descriptors()?;
        let provider = build_provider(config, Arc::clone(&servers))?;
        let registry = Arc::new(AvailabilityRegistry::new(servers.len()));

        let check = &config.auth_provider.auth_check;
        let monitor = if check.enable {
            let monitor = HealthMonitor::new(
                Arc::clone(&provider),
                Arc::clone(&registry),
                servers,
                check,
            );
            Some(monitor.spawn(token))
        } else {
            seed_all_available(&registry);
            None
        };

        Ok((Gateway::new(provider, registry), monitor))
    }

    pub fn registry(&self) -> &Arc<AvailabilityRegistry> {
        &self.registry
    }

    /// Check one set of credentials against the preferred available server
    pub async fn check_credentials(&self, request: &CredentialRequest) -> AuthOutcome {
        let snapshot = self.registry.snapshot();
        let Some(ordinal) = pick_server(&snapshot) else {
            warn!(
                username = %request.username,
                "No authentication server available"
            );
            return AuthOutcome::denied(AuthError::NoServerAvailable);
        };

        debug!(username = %request.username, ordinal, "Dispatching credential check");
        self.provider
            .authenticate_for_request(request, ordinal)
            .await
            .into()
    }

    pub async fn check(
        &self,
        username: &str,
        password: &str,
        client_ip: Option<IpAddr>,
    ) -> AuthOutcome {
        self.check_credentials(&CredentialRequest::new(username, password, client_ip))
            .await
    }

    /// Health summary of the backend servers
    pub fn current_status(&self) -> StatusReport {
        self.registry.status()
    }
}
