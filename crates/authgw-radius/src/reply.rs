//! Access-Accept / Access-Reject interpretation

use crate::attributes::AttributeType;
use crate::auth::verify_response_authenticator;
use crate::message_auth::verify_response_message_authenticator;
use crate::packet::{Code, Packet, PacketError};
use crate::request::AccessRequest;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("Malformed reply: {0}")]
    Decode(#[from] PacketError),
    #[error("Reply identifier {received} does not match request identifier {expected}")]
    IdentifierMismatch { expected: u8, received: u8 },
    #[error("Invalid Response Authenticator")]
    BadAuthenticator,
    #[error("Invalid Message-Authenticator")]
    BadMessageAuthenticator,
    #[error("Unexpected reply code {0}")]
    UnexpectedCode(Code),
}

/// What the gateway needs from a verified reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessReply {
    pub code: Code,
    pub framed_ip: Option<Ipv4Addr>,
    pub framed_netmask: Option<Ipv4Addr>,
    pub reply_message: Option<String>,
}

impl AccessReply {
    pub fn is_accept(&self) -> bool {
        self.code == Code::AccessAccept
    }
}

/// Decode and authenticate a datagram received in answer to `request`
///
/// Framed-IP-Address and Framed-IP-Netmask are only extracted from an
/// Access-Accept; a malformed value is treated as absent.
pub fn interpret_reply(
    raw: &[u8],
    request: &AccessRequest,
    secret: &[u8],
) -> Result<AccessReply, ReplyError> {
    let packet = Packet::decode(raw)?;

    if packet.identifier != request.identifier() {
        return Err(ReplyError::IdentifierMismatch {
            expected: request.identifier(),
            received: packet.identifier,
        });
    }

    let length = packet.length();
    let response = &raw[..length.min(raw.len())];
    if !verify_response_authenticator(response, &request.authenticator, secret) {
        return Err(ReplyError::BadAuthenticator);
    }

    if let Some(offset) = packet.attribute_value_offset(AttributeType::MessageAuthenticator as u8)
        && !verify_response_message_authenticator(response, &request.authenticator, secret, offset)
    {
        return Err(ReplyError::BadMessageAuthenticator);
    }

    let reply_message = packet
        .find_all_attributes(AttributeType::ReplyMessage as u8)
        .into_iter()
        .filter_map(|attr| attr.as_string().ok())
        .reduce(|mut joined, part| {
            joined.push_str(&part);
            joined
        });

    match packet.code {
        Code::AccessAccept => {
            let ipv4_of = |attr_type: AttributeType| {
                packet
                    .find_attribute(attr_type as u8)
                    .and_then(|attr| attr.as_ipv4().ok())
            };
            Ok(AccessReply {
                code: packet.code,
                framed_ip: ipv4_of(AttributeType::FramedIpAddress),
                framed_netmask: ipv4_of(AttributeType::FramedIpNetmask),
                reply_message,
            })
        }
        Code::AccessReject | Code::AccessChallenge => Ok(AccessReply {
            code: packet.code,
            framed_ip: None,
            framed_netmask: None,
            reply_message,
        }),
        other => Err(ReplyError::UnexpectedCode(other)),
    }
}
