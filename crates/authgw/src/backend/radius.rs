//! RADIUS backend client
//!
//! One Access-Request per authentication attempt, sent to the server picked
//! by the caller. The datagram is retransmitted unchanged every
//! [`RETRANSMIT_INTERVAL`] until a valid reply arrives or the server's
//! response timeout expires. Replies with a wrong identifier or authenticator
//! are dropped and the client keeps waiting.

use crate::config::{ConfigError, RadiusConfig, ServerDescriptor, ServerList, ServerParams};
use crate::error::{AuthError, AuthResult};
use crate::provider::{AuthProvider, CredentialRequest, NetworkData, server_at};
use async_trait::async_trait;
use authgw_radius::{
    AccessReply, AccessRequest, AccessRequestBuilder, AuthMethod, NasIdentity, Packet,
    interpret_reply,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

/// Delay between retransmissions of an unanswered request
pub const RETRANSMIT_INTERVAL: Duration = Duration::from_secs(1);

pub struct RadiusBackend {
    nas: NasIdentity,
    message_authenticator: bool,
    servers: ServerList,
}

impl RadiusBackend {
    pub fn new(config: &RadiusConfig, servers: ServerList) -> Result<Self, ConfigError> {
        Ok(RadiusBackend {
            nas: config.nas_identity()?,
            message_authenticator: config.message_authenticator,
            servers,
        })
    }

    fn radius_params(server: &ServerDescriptor) -> AuthResult<(&[u8], AuthMethod)> {
        match &server.params {
            ServerParams::Radius { secret, method } => Ok((secret.as_bytes(), *method)),
            ServerParams::Ldap { .. } => Err(AuthError::Protocol(format!(
                "server {} is not a RADIUS server",
                server.name
            ))),
        }
    }

    /// Build, send and wait for the verified reply of one Access-Request
    async fn attempt(
        &self,
        server: &ServerDescriptor,
        username: &str,
        password: &str,
        calling_station_id: Option<&str>,
    ) -> AuthResult<AccessReply> {
        let (secret, method) = Self::radius_params(server)?;

        let mut builder = AccessRequestBuilder::new(&self.nas, secret, method, username, password)
            .message_authenticator(self.message_authenticator);
        if let Some(station) = calling_station_id {
            builder = builder.calling_station_id(station);
        }
        let request = builder.build()?;

        debug!(
            server = %server.name,
            ordinal = server.ordinal,
            identifier = request.identifier(),
            method = %method,
            username = %username,
            "Sending Access-Request"
        );

        match timeout(server.response_timeout, exchange(server, &request, secret)).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Transport(format!(
                "no response from {} within {}s",
                server.endpoint(),
                server.response_timeout.as_secs()
            ))),
        }
    }
}

async fn resolve(server: &ServerDescriptor) -> AuthResult<SocketAddr> {
    lookup_host(server.endpoint())
        .await
        .map_err(|e| AuthError::Transport(format!("cannot resolve {}: {}", server.endpoint(), e)))?
        .next()
        .ok_or_else(|| AuthError::Transport(format!("no address for {}", server.endpoint())))
}

async fn exchange(
    server: &ServerDescriptor,
    request: &AccessRequest,
    secret: &[u8],
) -> AuthResult<AccessReply> {
    let target = resolve(server).await?;
    let local: SocketAddr = if target.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(target).await?;

    let mut retransmit = interval(RETRANSMIT_INTERVAL);
    retransmit.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];

    loop {
        tokio::select! {
            _ = retransmit.tick() => {
                socket.send(&request.encoded).await?;
            }
            received = socket.recv(&mut buf) => {
                let len = received?;
                match interpret_reply(&buf[..len], request, secret) {
                    Ok(reply) => return Ok(reply),
                    Err(e) => {
                        warn!(
                            server = %server.name,
                            error = %e,
                            "Discarding invalid RADIUS reply"
                        );
                    }
                }
            }
        }
    }
}

fn network_data(reply: &AccessReply) -> NetworkData {
    NetworkData {
        ip: reply.framed_ip.map(|ip| ip.to_string()).unwrap_or_default(),
        netmask: reply
            .framed_netmask
            .map(|mask| mask.to_string())
            .unwrap_or_default(),
    }
}

fn rejection_detail(reply: &AccessReply) -> String {
    match &reply.reply_message {
        Some(message) => format!("{}: {}", reply.code, message),
        None => reply.code.to_string(),
    }
}

#[async_trait]
impl AuthProvider for RadiusBackend {
    async fn authenticate_for_request(
        &self,
        request: &CredentialRequest,
        ordinal: usize,
    ) -> AuthResult<NetworkData> {
        let server = server_at(&self.servers, ordinal)?;
        let client_ip = request.client_ip.map(|ip| ip.to_string());

        let reply = match self
            .attempt(server, &request.username, &request.password, client_ip.as_deref())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    server = %server.name,
                    username = %request.username,
                    error = %e,
                    "RADIUS authentication attempt failed"
                );
                return Err(e);
            }
        };

        if reply.is_accept() {
            let network = network_data(&reply);
            info!(
                server = %server.name,
                username = %request.username,
                framed_ip = %network.ip,
                "RADIUS authentication successful"
            );
            Ok(network)
        } else {
            let detail = rejection_detail(&reply);
            warn!(
                server = %server.name,
                username = %request.username,
                code = %reply.code,
                reply_message = reply.reply_message.as_deref().unwrap_or(""),
                "RADIUS authentication rejected"
            );
            Err(AuthError::Rejected(detail))
        }
    }

    async fn authenticate_for_healthcheck(
        &self,
        username: &str,
        password: &str,
        ordinal: usize,
    ) -> AuthResult<bool> {
        let server = server_at(&self.servers, ordinal)?;
        let reply = self.attempt(server, username, password, None).await?;

        if !reply.is_accept() {
            debug!(
                server = %server.name,
                detail = %rejection_detail(&reply),
                "Health check credential rejected"
            );
        }
        Ok(reply.is_accept())
    }
}
