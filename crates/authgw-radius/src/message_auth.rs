//! Message-Authenticator Support (RFC 2869 Section 5.14, RFC 3579 Section 3.2)
//!
//! Message-Authenticator is an HMAC-MD5 over the whole packet keyed with the
//! shared secret, computed with the attribute value set to sixteen zero bytes.
//!
//! - Access-Request: computed over the packet as sent, carrying the Request
//!   Authenticator.
//! - Access-Accept / Reject / Challenge: computed with the *Request*
//!   Authenticator in the authenticator field, before the Response
//!   Authenticator is filled in.

use crate::packet::{Packet, PacketError};
use hmac::{Hmac, Mac};
use md5_digest::Md5;

type HmacMd5 = Hmac<Md5>;

/// Length of the Message-Authenticator value
pub const MESSAGE_AUTHENTICATOR_LENGTH: usize = 16;

fn keyed(secret: &[u8]) -> HmacMd5 {
    HmacMd5::new_from_slice(secret).expect("HMAC can take key of any size")
}

/// Calculate Message-Authenticator for a RADIUS packet
///
/// `packet_bytes` must already have the Message-Authenticator value zeroed.
pub fn calculate_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut mac = keyed(secret);
    mac.update(packet_bytes);
    let bytes = mac.finalize().into_bytes();

    let mut output = [0u8; 16];
    output.copy_from_slice(&bytes);
    output
}

/// Fill in the Message-Authenticator of an encoded request in place
///
/// `offset` is the position of the attribute value (after type and length).
pub fn sign_request(packet_bytes: &mut [u8], secret: &[u8], offset: usize) -> Result<(), PacketError> {
    if offset + MESSAGE_AUTHENTICATOR_LENGTH > packet_bytes.len() {
        return Err(PacketError::AttributeError(format!(
            "Message-Authenticator at offset {} outside {}-byte packet",
            offset,
            packet_bytes.len()
        )));
    }
    packet_bytes[offset..offset + MESSAGE_AUTHENTICATOR_LENGTH].fill(0);
    let mac = calculate_message_authenticator(packet_bytes, secret);
    packet_bytes[offset..offset + MESSAGE_AUTHENTICATOR_LENGTH].copy_from_slice(&mac);
    Ok(())
}

/// Verify Message-Authenticator in an encoded request
pub fn verify_message_authenticator(packet_bytes: &[u8], secret: &[u8], offset: usize) -> bool {
    if offset + MESSAGE_AUTHENTICATOR_LENGTH > packet_bytes.len() {
        return false;
    }

    let mut packet_copy = packet_bytes.to_vec();
    packet_copy[offset..offset + MESSAGE_AUTHENTICATOR_LENGTH].fill(0);

    let mut mac = keyed(secret);
    mac.update(&packet_copy);
    mac.verify_slice(&packet_bytes[offset..offset + MESSAGE_AUTHENTICATOR_LENGTH])
        .is_ok()
}

/// Verify Message-Authenticator in an encoded reply
pub fn verify_response_message_authenticator(
    response_bytes: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
    offset: usize,
) -> bool {
    if response_bytes.len() < Packet::MIN_PACKET_SIZE
        || offset + MESSAGE_AUTHENTICATOR_LENGTH > response_bytes.len()
    {
        return false;
    }

    let mut packet_copy = response_bytes.to_vec();
    packet_copy[4..Packet::MIN_PACKET_SIZE].copy_from_slice(request_authenticator);
    packet_copy[offset..offset + MESSAGE_AUTHENTICATOR_LENGTH].fill(0);

    let mut mac = keyed(secret);
    mac.update(&packet_copy);
    mac.verify_slice(&response_bytes[offset..offset + MESSAGE_AUTHENTICATOR_LENGTH])
        .is_ok()
}

/// Compute the Message-Authenticator a server would place in a reply
///
/// `response_bytes` is the encoded reply with any authenticator in place;
/// the header authenticator and the attribute value are replaced before hashing.
pub fn calculate_response_message_authenticator(
    response_bytes: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
    offset: usize,
) -> [u8; 16] {
    let mut packet_copy = response_bytes.to_vec();
    packet_copy[4..Packet::MIN_PACKET_SIZE].copy_from_slice(request_authenticator);
    packet_copy[offset..offset + MESSAGE_AUTHENTICATOR_LENGTH].fill(0);
    calculate_message_authenticator(&packet_copy, secret)
}
