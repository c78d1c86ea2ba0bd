//! Backend-agnostic authentication facade

use crate::backend::{LdapBackend, RadiusBackend};
use crate::config::{BackendKind, Config, ConfigError, ServerDescriptor, ServerList};
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

/// Credentials received for one check
#[derive(Clone)]
pub struct CredentialRequest {
    pub username: String,
    pub password: String,
    /// Address of the end client, reported to RADIUS as Calling-Station-Id
    pub client_ip: Option<IpAddr>,
}

impl CredentialRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>, client_ip: Option<IpAddr>) -> Self {
        CredentialRequest {
            username: username.into(),
            password: password.into(),
            client_ip,
        }
    }
}

impl fmt::Debug for CredentialRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_ip", &self.client_ip)
            .finish()
    }
}

/// Network settings assigned by the backend; empty strings when not assigned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkData {
    pub ip: String,
    pub netmask: String,
}

/// Result of one credential check as seen by the caller
#[derive(Debug)]
pub struct AuthOutcome {
    pub success: bool,
    pub network: Option<NetworkData>,
    pub error: Option<AuthError>,
}

impl AuthOutcome {
    pub fn granted(network: NetworkData) -> Self {
        AuthOutcome {
            success: true,
            network: Some(network),
            error: None,
        }
    }

    pub fn denied(error: AuthError) -> Self {
        AuthOutcome {
            success: false,
            network: None,
            error: Some(error),
        }
    }

    /// Message safe to return to the end client, `None` on success
    pub fn user_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(AuthError::user_message)
    }
}

impl From<AuthResult<NetworkData>> for AuthOutcome {
    fn from(result: AuthResult<NetworkData>) -> Self {
        match result {
            Ok(network) => AuthOutcome::granted(network),
            Err(error) => AuthOutcome::denied(error),
        }
    }
}

/// The two operations every backend family provides
///
/// Servers are addressed by ordinal in the configured list. A health check
/// returning `Ok(false)` means the server answered and denied the monitoring
/// credential; `Err` means it could not be asked.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Authenticate an end user against the server chosen by the selection policy
    async fn authenticate_for_request(
        &self,
        request: &CredentialRequest,
        ordinal: usize,
    ) -> AuthResult<NetworkData>;

    /// Authenticate the monitoring account against an explicit server
    async fn authenticate_for_healthcheck(
        &self,
        username: &str,
        password: &str,
        ordinal: usize,
    ) -> AuthResult<bool>;
}

/// Look up a descriptor by ordinal
pub(crate) fn server_at(servers: &ServerList, ordinal: usize) -> AuthResult<&ServerDescriptor> {
    servers.get(ordinal).ok_or(AuthError::UnknownServer(ordinal))
}

/// Construct the configured backend once for the process lifetime
pub fn build_provider(config: &Config, servers: ServerList) -> Result<Arc<dyn AuthProvider>, ConfigError> {
    info!(
        backend = %config.auth_provider.kind,
        servers = servers.len(),
        "Initialising authentication provider"
    );

    let provider: Arc<dyn AuthProvider> = match config.auth_provider.kind {
        BackendKind::Radius => Arc::new(RadiusBackend::new(config.radius()?, servers)?),
        BackendKind::Ldap => Arc::new(LdapBackend::new(config.ldap()?, servers)),
    };
    Ok(provider)
}
