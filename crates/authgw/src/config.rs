use authgw_radius::{AuthMethod, NasIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Placeholder written in place of secrets by `Debug` impls
const REDACTED: &str = "<redacted>";

/// Upper bound for a server's response timeout, in seconds
pub const MAX_RESPONSE_TIMEOUT_SECS: u64 = 3600;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which backend family answers credential checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Radius,
    Ldap,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Radius => write!(f, "radius"),
            BackendKind::Ldap => write!(f, "ldap"),
        }
    }
}

/// One RADIUS server entry
#[derive(Clone, Serialize, Deserialize)]
pub struct RadiusServerConfig {
    pub name: String,
    pub address: String,
    #[serde(default = "default_radius_port")]
    pub port: u16,
    pub secret: String,
    /// "pap" or "mschapv2"
    #[serde(default)]
    pub protocol: AuthMethod,
    #[serde(default = "default_response_timeout")]
    pub response_timeout_sec: u64,
}

impl fmt::Debug for RadiusServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadiusServerConfig")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("secret", &REDACTED)
            .field("protocol", &self.protocol)
            .field("response_timeout_sec", &self.response_timeout_sec)
            .finish()
    }
}

/// RADIUS backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadiusConfig {
    /// NAS-Identifier sent with every request
    #[serde(default)]
    pub nas_id: Option<String>,
    /// NAS-IP-Address sent with every request
    #[serde(default)]
    pub nas_ipv4_address: Option<String>,
    /// NAS-Port, 443 when unset or 0
    #[serde(default)]
    pub nas_port: Option<u32>,
    /// Sign requests with Message-Authenticator
    #[serde(default = "default_true")]
    pub message_authenticator: bool,
    #[serde(default)]
    pub servers: Vec<RadiusServerConfig>,
}

impl RadiusConfig {
    pub fn nas_identity(&self) -> Result<NasIdentity, ConfigError> {
        let ipv4 = match &self.nas_ipv4_address {
            Some(address) if !address.is_empty() => Some(address.parse::<Ipv4Addr>().map_err(
                |_| ConfigError::Invalid(format!("Invalid NAS IPv4 address: {}", address)),
            )?),
            _ => None,
        };

        Ok(NasIdentity {
            identifier: self.nas_id.clone().filter(|id| !id.is_empty()),
            ipv4,
            port: self.nas_port.filter(|&port| port != 0),
        })
    }
}

/// One directory server entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapServerConfig {
    pub name: String,
    pub address: String,
    #[serde(default = "default_ldap_port")]
    pub port: u16,
    /// Connect with TLS (ldaps)
    #[serde(default)]
    pub ssl: bool,
    #[serde(default = "default_response_timeout")]
    pub response_timeout_sec: u64,
}

/// LDAP backend settings
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Service account DN used for the user search
    pub bind_dn: String,
    /// Service account password
    pub pass: String,
    pub search_base: String,
    /// Filter template; `{username}` is replaced with the escaped login
    #[serde(default = "default_search_filter")]
    pub search_filter: String,
    /// Verify the server certificate on TLS connections
    #[serde(default = "default_true")]
    pub verify_cert: bool,
    #[serde(default)]
    pub servers: Vec<LdapServerConfig>,
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("bind_dn", &self.bind_dn)
            .field("pass", &REDACTED)
            .field("search_base", &self.search_base)
            .field("search_filter", &self.search_filter)
            .field("verify_cert", &self.verify_cert)
            .field("servers", &self.servers)
            .finish()
    }
}

/// Periodic health check settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthCheckConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_interval")]
    pub interval_sec: u64,
    /// Monitoring account probed against every server
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
}

impl fmt::Debug for AuthCheckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCheckConfig")
            .field("enable", &self.enable)
            .field("interval_sec", &self.interval_sec)
            .field("user", &self.user)
            .field("pass", &REDACTED)
            .finish()
    }
}

impl Default for AuthCheckConfig {
    fn default() -> Self {
        AuthCheckConfig {
            enable: false,
            interval_sec: default_interval(),
            user: String::new(),
            pass: String::new(),
        }
    }
}

impl AuthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_sec)
    }
}

/// Backend selection and the settings of the selected family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthProviderConfig {
    #[serde(rename = "type")]
    pub kind: BackendKind,
    #[serde(default)]
    pub radius: Option<RadiusConfig>,
    #[serde(default)]
    pub ldap: Option<LdapConfig>,
    #[serde(default)]
    pub auth_check: AuthCheckConfig,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    pub auth_provider: AuthProviderConfig,
}

fn default_radius_port() -> u16 {
    1812
}

fn default_ldap_port() -> u16 {
    389
}

fn default_response_timeout() -> u64 {
    5
}

fn default_interval() -> u64 {
    30
}

fn default_search_filter() -> String {
    "(uid={username})".to_string()
}

fn default_true() -> bool {
    true
}

/// Backend-specific part of a server descriptor
#[derive(Clone, PartialEq, Eq)]
pub enum ServerParams {
    Radius { secret: String, method: AuthMethod },
    Ldap { ssl: bool },
}

impl fmt::Debug for ServerParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerParams::Radius { method, .. } => f
                .debug_struct("Radius")
                .field("secret", &REDACTED)
                .field("method", method)
                .finish(),
            ServerParams::Ldap { ssl } => f.debug_struct("Ldap").field("ssl", ssl).finish(),
        }
    }
}

/// Immutable record of one configured server, identified by its ordinal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    /// Position in the configured server list
    pub ordinal: usize,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub response_timeout: Duration,
    pub params: ServerParams,
}

impl ServerDescriptor {
    /// `address:port`, bracketing bare IPv6 literals
    pub fn endpoint(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// Ordinal-indexed descriptors shared by every component
pub type ServerList = Arc<[ServerDescriptor]>;

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration from a JSON document
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Effective log level
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Settings of the selected RADIUS backend
    pub fn radius(&self) -> Result<&RadiusConfig, ConfigError> {
        self.auth_provider
            .radius
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("Missing \"radius\" section".to_string()))
    }

    /// Settings of the selected LDAP backend
    pub fn ldap(&self) -> Result<&LdapConfig, ConfigError> {
        self.auth_provider
            .ldap
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("Missing \"ldap\" section".to_string()))
    }

    /// Descriptors of the servers of the selected backend, in configured order
    pub fn server_descriptors(&self) -> Result<ServerList, ConfigError> {
        let descriptors: Vec<ServerDescriptor> = match self.auth_provider.kind {
            BackendKind::Radius => self
                .radius()?
                .servers
                .iter()
                .enumerate()
                .map(|(ordinal, server)| ServerDescriptor {
                    ordinal,
                    name: server.name.clone(),
                    address: server.address.clone(),
                    port: server.port,
                    response_timeout: Duration::from_secs(server.response_timeout_sec),
                    params: ServerParams::Radius {
                        secret: server.secret.clone(),
                        method: server.protocol,
                    },
                })
                .collect(),
            BackendKind::Ldap => self
                .ldap()?
                .servers
                .iter()
                .enumerate()
                .map(|(ordinal, server)| ServerDescriptor {
                    ordinal,
                    name: server.name.clone(),
                    address: server.address.clone(),
                    port: server.port,
                    response_timeout: Duration::from_secs(server.response_timeout_sec),
                    params: ServerParams::Ldap { ssl: server.ssl },
                })
                .collect(),
        };

        Ok(descriptors.into())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.log_level
            && !["trace", "debug", "info", "warn", "error"].contains(&level.as_str())
        {
            return Err(ConfigError::Invalid(format!("Invalid log level: {}", level)));
        }

        match self.auth_provider.kind {
            BackendKind::Radius => {
                let radius = self.radius()?;
                if radius.servers.is_empty() {
                    return Err(ConfigError::Invalid(
                        "No RADIUS servers configured".to_string(),
                    ));
                }
                radius.nas_identity()?;

                for server in &radius.servers {
                    validate_endpoint(
                        &server.name,
                        &server.address,
                        server.port,
                        server.response_timeout_sec,
                    )?;
                    if server.secret.is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "RADIUS server {} has empty secret",
                            server.name
                        )));
                    }
                }
            }
            BackendKind::Ldap => {
                let ldap = self.ldap()?;
                if ldap.servers.is_empty() {
                    return Err(ConfigError::Invalid("No LDAP servers configured".to_string()));
                }
                if ldap.search_base.is_empty() {
                    return Err(ConfigError::Invalid(
                        "LDAP search base cannot be empty".to_string(),
                    ));
                }
                if !ldap.search_filter.contains("{username}") {
                    return Err(ConfigError::Invalid(format!(
                        "LDAP search filter must contain {{username}}: {}",
                        ldap.search_filter
                    )));
                }

                for server in &ldap.servers {
                    validate_endpoint(
                        &server.name,
                        &server.address,
                        server.port,
                        server.response_timeout_sec,
                    )?;
                }
            }
        }

        let check = &self.auth_provider.auth_check;
        if check.enable {
            if check.interval_sec == 0 {
                return Err(ConfigError::Invalid(
                    "Health check interval cannot be 0".to_string(),
                ));
            }
            if check.user.is_empty() {
                return Err(ConfigError::Invalid(
                    "Health check user cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn validate_endpoint(name: &str, address: &str, port: u16, timeout: u64) -> Result<(), ConfigError> {
    if address.is_empty() {
        return Err(ConfigError::Invalid(format!("Server {} has empty address", name)));
    }
    if port == 0 {
        return Err(ConfigError::Invalid(format!("Server {} port cannot be 0", name)));
    }
    if timeout == 0 {
        return Err(ConfigError::Invalid(format!(
            "Server {} response timeout cannot be 0",
            name
        )));
    }
    if timeout > MAX_RESPONSE_TIMEOUT_SECS {
        return Err(ConfigError::Invalid(format!(
            "Server {} response timeout {}s exceeds {}s",
            name, timeout, MAX_RESPONSE_TIMEOUT_SECS
        )));
    }
    Ok(())
}
