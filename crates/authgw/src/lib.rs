//! Authentication gateway
//!
//! Validates username/password pairs against either a set of RADIUS servers
//! or a set of LDAP directory servers, chosen once from configuration.
//!
//! - [`provider`]: the backend-agnostic [`AuthProvider`] facade
//! - [`registry`]: which servers are currently usable
//! - [`monitor`]: periodic concurrent health checks feeding the registry
//! - [`selection`]: the server a request is sent to
//! - [`dispatch`]: the [`Gateway`] entry point for credential checks
//!
//! # Example
//!
//! ```no_run
//! use authgw::{Config, Gateway};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file("authgw.json")?;
//! let (gateway, _monitor) = Gateway::launch(&config, CancellationToken::new())?;
//!
//! let outcome = gateway.check("alice", "password", "192.0.2.10".parse().ok()).await;
//! if outcome.success {
//!     println!("assigned {:?}", outcome.network);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod monitor;
pub mod provider;
pub mod registry;
pub mod selection;

pub use config::{BackendKind, Config, ConfigError, ServerDescriptor, ServerList, ServerParams};
pub use dispatch::Gateway;
pub use error::{AuthError, AuthResult};
pub use monitor::{HealthMonitor, seed_all_available};
pub use provider::{AuthOutcome, AuthProvider, CredentialRequest, NetworkData, build_provider};
pub use registry::{AvailabilityRegistry, AvailabilitySnapshot, ServiceStatus, StatusReport};
pub use selection::pick_server;
