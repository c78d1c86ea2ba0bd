//! Access-Request construction for the two supported authentication methods

use crate::attributes::{Attribute, AttributeType, MsAttributeType, NasPortType, VendorSpecific};
use crate::auth::{encrypt_user_password, generate_request_authenticator};
use crate::message_auth::{MESSAGE_AUTHENTICATOR_LENGTH, sign_request};
use crate::mschapv2::{CHALLENGE_LENGTH, MsChap2Response, generate_nt_response};
use crate::packet::{Code, Packet, PacketError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// NAS-Port used when none is configured
pub const DEFAULT_NAS_PORT: u32 = 443;

/// How the password is carried in the Access-Request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthMethod {
    /// Hidden User-Password attribute (RFC 2865 Section 5.2)
    #[default]
    #[serde(rename = "pap")]
    Pap,
    /// MS-CHAP-Challenge + MS-CHAP2-Response vendor attributes (RFC 2548)
    #[serde(rename = "mschapv2")]
    MsChapV2,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Pap => write!(f, "pap"),
            AuthMethod::MsChapV2 => write!(f, "mschapv2"),
        }
    }
}

/// Identity this gateway presents to RADIUS servers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NasIdentity {
    pub identifier: Option<String>,
    pub ipv4: Option<Ipv4Addr>,
    pub port: Option<u32>,
}

/// An encoded Access-Request, kept together with what is needed to check the reply
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub packet: Packet,
    pub encoded: Vec<u8>,
    pub authenticator: [u8; 16],
    /// Whether the request was signed with a Message-Authenticator
    pub signed: bool,
}

impl AccessRequest {
    pub fn identifier(&self) -> u8 {
        self.packet.identifier
    }
}

/// Builder for a single Access-Request
#[derive(Debug, Clone)]
pub struct AccessRequestBuilder<'a> {
    nas: &'a NasIdentity,
    secret: &'a [u8],
    method: AuthMethod,
    username: &'a str,
    password: &'a str,
    calling_station_id: Option<&'a str>,
    message_authenticator: bool,
    identifier: Option<u8>,
}

impl<'a> AccessRequestBuilder<'a> {
    pub fn new(
        nas: &'a NasIdentity,
        secret: &'a [u8],
        method: AuthMethod,
        username: &'a str,
        password: &'a str,
    ) -> Self {
        AccessRequestBuilder {
            nas,
            secret,
            method,
            username,
            password,
            calling_station_id: None,
            message_authenticator: false,
            identifier: None,
        }
    }

    /// Calling-Station-Id, normally the address of the end client
    pub fn calling_station_id(mut self, value: &'a str) -> Self {
        self.calling_station_id = Some(value);
        self
    }

    pub fn message_authenticator(mut self, enabled: bool) -> Self {
        self.message_authenticator = enabled;
        self
    }

    /// Fix the packet identifier instead of picking a random one
    pub fn identifier(mut self, identifier: u8) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Build with freshly generated authenticator and, for MS-CHAPv2, fresh challenges
    pub fn build(self) -> Result<AccessRequest, PacketError> {
        let mut rng = rand::rng();
        let mut authenticator_challenge = [0u8; CHALLENGE_LENGTH];
        let mut peer_challenge = [0u8; CHALLENGE_LENGTH];
        rng.fill(&mut authenticator_challenge);
        rng.fill(&mut peer_challenge);

        self.build_with_challenges(authenticator_challenge, peer_challenge)
    }

    /// Build with caller-supplied MS-CHAPv2 challenges (ignored for PAP)
    pub fn build_with_challenges(
        self,
        authenticator_challenge: [u8; CHALLENGE_LENGTH],
        peer_challenge: [u8; CHALLENGE_LENGTH],
    ) -> Result<AccessRequest, PacketError> {
        let authenticator = generate_request_authenticator();
        let identifier = self.identifier.unwrap_or_else(|| rand::rng().random());
        let mut packet = Packet::new(Code::AccessRequest, identifier, authenticator);

        packet.add_attribute(Attribute::string(
            AttributeType::UserName as u8,
            self.username,
        )?);

        match self.method {
            AuthMethod::Pap => {
                let hidden = encrypt_user_password(self.password, self.secret, &authenticator)?;
                packet.add_attribute(Attribute::new(AttributeType::UserPassword as u8, hidden)?);
            }
            AuthMethod::MsChapV2 => {
                let nt_response = generate_nt_response(
                    &authenticator_challenge,
                    &peer_challenge,
                    self.username,
                    self.password,
                );
                let response = MsChap2Response::new(peer_challenge, nt_response);

                packet.add_attribute(
                    VendorSpecific::microsoft(
                        MsAttributeType::ChapChallenge,
                        authenticator_challenge.to_vec(),
                    )
                    .to_attribute()?,
                );
                packet.add_attribute(
                    VendorSpecific::microsoft(MsAttributeType::Chap2Response, response.to_bytes())
                        .to_attribute()?,
                );
            }
        }

        if let Some(nas_id) = &self.nas.identifier {
            packet.add_attribute(Attribute::string(
                AttributeType::NasIdentifier as u8,
                nas_id.as_str(),
            )?);
        }
        if let Some(nas_ip) = self.nas.ipv4 {
            packet.add_attribute(Attribute::ipv4(AttributeType::NasIpAddress as u8, nas_ip)?);
        }
        packet.add_attribute(Attribute::integer(
            AttributeType::NasPort as u8,
            self.nas.port.unwrap_or(DEFAULT_NAS_PORT),
        )?);
        packet.add_attribute(Attribute::integer(
            AttributeType::NasPortType as u8,
            NasPortType::Virtual.as_u32(),
        )?);
        if let Some(station) = self.calling_station_id {
            packet.add_attribute(Attribute::string(
                AttributeType::CallingStationId as u8,
                station,
            )?);
        }

        if self.message_authenticator {
            packet.add_attribute(Attribute::new(
                AttributeType::MessageAuthenticator as u8,
                vec![0u8; MESSAGE_AUTHENTICATOR_LENGTH],
            )?);
        }

        let mut encoded = packet.encode()?;

        if self.message_authenticator {
            let offset = packet
                .attribute_value_offset(AttributeType::MessageAuthenticator as u8)
                .ok_or_else(|| {
                    PacketError::AttributeError("Message-Authenticator not present".to_string())
                })?;
            sign_request(&mut encoded, self.secret, offset)?;
            // Keep the decoded view consistent with the bytes on the wire
            packet = Packet::decode(&encoded)?;
        }

        Ok(AccessRequest {
            packet,
            encoded,
            authenticator,
            signed: self.message_authenticator,
        })
    }
}
