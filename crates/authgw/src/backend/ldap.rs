//! LDAP/Active Directory backend client
//!
//! Bind as the service account, search for the user's entry, then bind as
//! that entry with the supplied password. The outcome of the second bind is
//! the authentication result.

use crate::config::{LdapConfig, ServerDescriptor, ServerList, ServerParams};
use crate::error::{AuthError, AuthResult};
use crate::provider::{AuthProvider, CredentialRequest, NetworkData, server_at};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, ldap_escape};
use std::fmt;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// LDAP resultCode for a successful operation
const RC_SUCCESS: u32 = 0;
/// LDAP resultCode invalidCredentials (RFC 4511 Appendix A)
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Directory operations used by the bind/search/bind flow
#[async_trait]
pub trait Directory: Send {
    /// Simple bind, returning the LDAP result code
    async fn bind(&mut self, dn: &str, password: &str) -> AuthResult<u32>;

    /// Subtree search returning the DNs of the matching entries
    async fn search_dns(&mut self, base: &str, filter: &str) -> AuthResult<Vec<String>>;
}

/// Settings shared by every directory server
#[derive(Clone)]
pub struct DirectorySettings {
    pub bind_dn: String,
    pub bind_password: String,
    pub search_base: String,
    pub search_filter: String,
    pub verify_cert: bool,
}

impl fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("search_base", &self.search_base)
            .field("search_filter", &self.search_filter)
            .field("verify_cert", &self.verify_cert)
            .finish()
    }
}

impl From<&LdapConfig> for DirectorySettings {
    fn from(config: &LdapConfig) -> Self {
        DirectorySettings {
            bind_dn: config.bind_dn.clone(),
            bind_password: config.pass.clone(),
            search_base: config.search_base.clone(),
            search_filter: config.search_filter.clone(),
            verify_cert: config.verify_cert,
        }
    }
}

impl DirectorySettings {
    /// Search filter with the escaped username substituted
    pub fn user_filter(&self, username: &str) -> String {
        self.search_filter
            .replace("{username}", &ldap_escape(username))
    }
}

/// Run the bind/search/bind flow on an open directory session
///
/// Returns `Ok(false)` when the directory refuses the user's password.
pub async fn bind_search_bind<D: Directory + ?Sized>(
    directory: &mut D,
    settings: &DirectorySettings,
    username: &str,
    password: &str,
) -> AuthResult<bool> {
    let rc = directory
        .bind(&settings.bind_dn, &settings.bind_password)
        .await?;
    if rc != RC_SUCCESS {
        return Err(AuthError::Protocol(format!(
            "service account bind as {} failed with result code {}",
            settings.bind_dn, rc
        )));
    }

    let filter = settings.user_filter(username);
    debug!(
        username = %username,
        base_dn = %settings.search_base,
        filter = %filter,
        "Searching for user in LDAP"
    );

    let dns = directory.search_dns(&settings.search_base, &filter).await?;
    let Some(user_dn) = dns.first() else {
        warn!(username = %username, "User not found in LDAP");
        return Err(AuthError::NotFound(username.to_string()));
    };
    if dns.len() > 1 {
        warn!(
            username = %username,
            count = dns.len(),
            "Multiple users found in LDAP, using first result"
        );
    }

    // An empty password would turn the bind into an unauthenticated bind
    if password.is_empty() {
        warn!(dn = %user_dn, "Refusing LDAP bind with empty password");
        return Ok(false);
    }

    match directory.bind(user_dn, password).await? {
        RC_SUCCESS => Ok(true),
        RC_INVALID_CREDENTIALS => Ok(false),
        rc => Err(AuthError::Protocol(format!(
            "bind as {} failed with result code {}",
            user_dn, rc
        ))),
    }
}

/// A connected `ldap3` session
struct LdapSession {
    ldap: Ldap,
}

fn transport(e: ldap3::LdapError) -> AuthError {
    AuthError::Transport(e.to_string())
}

impl LdapSession {
    async fn connect(server: &ServerDescriptor, settings: &DirectorySettings) -> AuthResult<Self> {
        let ssl = matches!(server.params, ServerParams::Ldap { ssl: true });
        let scheme = if ssl { "ldaps" } else { "ldap" };
        let url = format!("{}://{}", scheme, server.endpoint());

        debug!(server = %server.name, url = %url, "Creating new LDAP connection");
        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(server.response_timeout)
            .set_no_tls_verify(!settings.verify_cert);

        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, &url)
            .await
            .map_err(transport)?;

        // Start connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                error!("LDAP connection driver error: {}", e);
            }
        });

        Ok(LdapSession { ldap })
    }

    async fn close(mut self) {
        if let Err(e) = self.ldap.unbind().await {
            debug!(error = %e, "LDAP unbind failed");
        }
    }
}

#[async_trait]
impl Directory for LdapSession {
    async fn bind(&mut self, dn: &str, password: &str) -> AuthResult<u32> {
        let result = self.ldap.simple_bind(dn, password).await.map_err(transport)?;
        Ok(result.rc)
    }

    async fn search_dns(&mut self, base: &str, filter: &str) -> AuthResult<Vec<String>> {
        let (entries, _) = self
            .ldap
            .search(base, Scope::Subtree, filter, vec!["1.1"])
            .await
            .map_err(transport)?
            .success()
            .map_err(|e| AuthError::Protocol(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| SearchEntry::construct(entry).dn)
            .collect())
    }
}

pub struct LdapBackend {
    settings: DirectorySettings,
    servers: ServerList,
}

impl LdapBackend {
    pub fn new(config: &LdapConfig, servers: ServerList) -> Self {
        if !config.verify_cert {
            warn!("LDAP server certificate verification is disabled");
        }
        LdapBackend {
            settings: DirectorySettings::from(config),
            servers,
        }
    }

    /// Connect to one server and run the full flow within its response timeout
    async fn attempt(
        &self,
        server: &ServerDescriptor,
        username: &str,
        password: &str,
    ) -> AuthResult<bool> {
        let flow = async {
            let mut session = LdapSession::connect(server, &self.settings).await?;
            let result = bind_search_bind(&mut session, &self.settings, username, password).await;
            session.close().await;
            result
        };

        timeout(server.response_timeout, flow).await?
    }
}

#[async_trait]
impl AuthProvider for LdapBackend {
    async fn authenticate_for_request(
        &self,
        request: &CredentialRequest,
        ordinal: usize,
    ) -> AuthResult<NetworkData> {
        let server = server_at(&self.servers, ordinal)?;

        match self
            .attempt(server, &request.username, &request.password)
            .await
        {
            Ok(true) => {
                info!(
                    server = %server.name,
                    username = %request.username,
                    "LDAP authentication successful"
                );
                Ok(NetworkData::default())
            }
            Ok(false) => {
                warn!(
                    server = %server.name,
                    username = %request.username,
                    "LDAP bind rejected user credentials"
                );
                Err(AuthError::Rejected("invalid credentials".to_string()))
            }
            Err(e) => {
                warn!(
                    server = %server.name,
                    username = %request.username,
                    error = %e,
                    "LDAP authentication attempt failed"
                );
                Err(e)
            }
        }
    }

    async fn authenticate_for_healthcheck(
        &self,
        username: &str,
        password: &str,
        ordinal: usize,
    ) -> AuthResult<bool> {
        let server = server_at(&self.servers, ordinal)?;
        self.attempt(server, username, password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory directory: DN -> password, plus canned search results
    #[derive(Default)]
    struct FakeDirectory {
        passwords: HashMap<String, String>,
        search_results: Vec<String>,
        binds: Vec<String>,
        filters: Vec<String>,
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn bind(&mut self, dn: &str, password: &str) -> AuthResult<u32> {
            self.binds.push(dn.to_string());
            match self.passwords.get(dn) {
                Some(expected) if expected == password => Ok(RC_SUCCESS),
                Some(_) => Ok(RC_INVALID_CREDENTIALS),
                None => Ok(32),
            }
        }

        async fn search_dns(&mut self, _base: &str, filter: &str) -> AuthResult<Vec<String>> {
            self.filters.push(filter.to_string());
            Ok(self.search_results.clone())
        }
    }

    fn settings() -> DirectorySettings {
        DirectorySettings {
            bind_dn: "cn=svc,dc=example,dc=com".to_string(),
            bind_password: "svc-pw".to_string(),
            search_base: "dc=example,dc=com".to_string(),
            search_filter: "(sAMAccountName={username})".to_string(),
            verify_cert: true,
        }
    }

    fn directory(results: &[&str]) -> FakeDirectory {
        let mut directory = FakeDirectory::default();
        directory
            .passwords
            .insert("cn=svc,dc=example,dc=com".to_string(), "svc-pw".to_string());
        directory
            .passwords
            .insert("cn=alice,dc=example,dc=com".to_string(), "alice-pw".to_string());
        directory.search_results = results.iter().map(|dn| dn.to_string()).collect();
        directory
    }

    #[tokio::test]
    async fn test_successful_bind_search_bind() {
        let mut dir = directory(&["cn=alice,dc=example,dc=com"]);
        let result = bind_search_bind(&mut dir, &settings(), "alice", "alice-pw").await;

        assert!(result.unwrap());
        assert_eq!(
            dir.binds,
            vec!["cn=svc,dc=example,dc=com", "cn=alice,dc=example,dc=com"]
        );
        assert_eq!(dir.filters, vec!["(sAMAccountName=alice)"]);
    }

    #[tokio::test]
    async fn test_wrong_password_is_false() {
        let mut dir = directory(&["cn=alice,dc=example,dc=com"]);
        let result = bind_search_bind(&mut dir, &settings(), "alice", "nope").await;
        assert!(!result.unwrap());
    }

    #[tokio::test]
    async fn test_zero_entries_is_not_found() {
        let mut dir = directory(&[]);
        let result = bind_search_bind(&mut dir, &settings(), "ghost", "whatever").await;

        assert!(matches!(result, Err(AuthError::NotFound(ref user)) if user == "ghost"));
        assert_eq!(dir.binds.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_password_never_binds_as_user() {
        let mut dir = directory(&["cn=alice,dc=example,dc=com"]);
        let result = bind_search_bind(&mut dir, &settings(), "alice", "").await;

        assert!(!result.unwrap());
        assert_eq!(dir.binds, vec!["cn=svc,dc=example,dc=com"]);
    }

    #[tokio::test]
    async fn test_service_bind_failure_is_protocol_error() {
        let mut dir = directory(&["cn=alice,dc=example,dc=com"]);
        dir.passwords
            .insert("cn=svc,dc=example,dc=com".to_string(), "rotated".to_string());

        let result = bind_search_bind(&mut dir, &settings(), "alice", "alice-pw").await;
        assert!(matches!(result, Err(AuthError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_unexpected_result_code_is_protocol_error() {
        let mut dir = directory(&["cn=bob,dc=example,dc=com"]);
        let result = bind_search_bind(&mut dir, &settings(), "bob", "pw").await;
        assert!(matches!(result, Err(AuthError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_first_entry_wins() {
        let mut dir = directory(&["cn=alice,dc=example,dc=com", "cn=alice2,dc=example,dc=com"]);
        let result = bind_search_bind(&mut dir, &settings(), "alice", "alice-pw").await;
        assert!(result.unwrap());
    }

    #[test]
    fn test_filter_escaping() {
        let settings = settings();
        assert_eq!(settings.user_filter("jdoe"), "(sAMAccountName=jdoe)");
        assert_eq!(
            settings.user_filter("*)(uid=*"),
            "(sAMAccountName=\\2a\\29\\28uid=\\2a)"
        );
    }

    #[test]
    fn test_settings_debug_hides_password() {
        assert!(!format!("{:?}", settings()).contains("svc-pw"));
    }
}
