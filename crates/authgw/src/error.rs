//! Authentication error taxonomy

use thiserror::Error;

/// Text returned to callers for every failure attributable to a backend
pub const AUTHENTICATION_FAILED: &str = "authentication failed";
/// Text returned to callers when no backend server is usable
pub const NO_SERVER_AVAILABLE: &str = "no authentication server available";

/// Authentication failures
///
/// Only [`AuthError::NoServerAvailable`] is distinguishable by callers; the
/// remaining variants carry operator detail for logs.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Timeout, refused connection, DNS failure or socket I/O
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server explicitly denied the credential
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// The directory has no entry for the login
    #[error("User with login {0} not found")]
    NotFound(String),

    /// The selection policy found no available server
    #[error("No authentication server available")]
    NoServerAvailable,

    /// Undecodable or unauthenticated reply, unexpected result code
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Ordinal outside the configured server list
    #[error("Unknown server ordinal: {0}")]
    UnknownServer(usize),
}

impl AuthError {
    /// Message safe to hand to the end client
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NoServerAvailable => NO_SERVER_AVAILABLE,
            _ => AUTHENTICATION_FAILED,
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(e: std::io::Error) -> Self {
        AuthError::Transport(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for AuthError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AuthError::Transport("response timeout".to_string())
    }
}

impl From<authgw_radius::PacketError> for AuthError {
    fn from(e: authgw_radius::PacketError) -> Self {
        AuthError::Protocol(e.to_string())
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
