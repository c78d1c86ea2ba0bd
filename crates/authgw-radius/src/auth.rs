use crate::packet::{Packet, PacketError};
use rand::Rng;

/// Longest password the User-Password attribute can carry (RFC 2865 Section 5.2)
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Calculate a Response Authenticator over an encoded reply
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
///
/// `response` must be the encoded packet truncated to its Length field.
pub fn calculate_response_authenticator(
    response: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> [u8; 16] {
    let mut context = md5::Context::new();
    context.consume(&response[..4]);
    context.consume(request_authenticator);
    context.consume(&response[Packet::MIN_PACKET_SIZE..]);
    context.consume(secret);
    context.compute().0
}

/// Verify the Response Authenticator of an encoded reply
pub fn verify_response_authenticator(
    response: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    if response.len() < Packet::MIN_PACKET_SIZE {
        return false;
    }
    let calculated = calculate_response_authenticator(response, request_authenticator, secret);
    response[4..Packet::MIN_PACKET_SIZE] == calculated
}

/// Encode a reply packet and stamp its Response Authenticator
///
/// The authenticator currently stored in `packet` is ignored.
pub fn encode_response(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<Vec<u8>, PacketError> {
    let mut bytes = packet.encode()?;
    let authenticator = calculate_response_authenticator(&bytes, request_authenticator, secret);
    bytes[4..Packet::MIN_PACKET_SIZE].copy_from_slice(&authenticator);
    Ok(bytes)
}

/// Encrypt User-Password attribute per RFC 2865 Section 5.2
///
/// The password is padded with NULs to a multiple of 16 bytes, then XORed with
/// MD5(secret + request_authenticator) for the first block and
/// MD5(secret + previous ciphertext block) for subsequent blocks.
pub fn encrypt_user_password(
    password: &str,
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    let password_bytes = password.as_bytes();
    if password_bytes.len() > MAX_PASSWORD_LENGTH {
        return Err(PacketError::AttributeError(format!(
            "Password too long: {} bytes (max {})",
            password_bytes.len(),
            MAX_PASSWORD_LENGTH
        )));
    }

    let padded_len = password_bytes.len().div_ceil(16).max(1) * 16;
    let mut padded = password_bytes.to_vec();
    padded.resize(padded_len, 0);

    let mut result = Vec::with_capacity(padded_len);
    let mut previous_block: [u8; 16] = *authenticator;

    for chunk in padded.chunks(16) {
        let mut context = md5::Context::new();
        context.consume(secret);
        context.consume(previous_block);
        let hash = context.compute();

        for (i, byte) in previous_block.iter_mut().enumerate() {
            *byte = chunk[i] ^ hash.0[i];
        }
        result.extend_from_slice(&previous_block);
    }

    Ok(result)
}

/// Decrypt User-Password attribute per RFC 2865 Section 5.2
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, PacketError> {
    if encrypted.len() % 16 != 0 || encrypted.is_empty() {
        return Err(PacketError::AttributeError(
            "Invalid encrypted password length".to_string(),
        ));
    }

    let mut result = Vec::with_capacity(encrypted.len());
    let mut previous_block: &[u8] = authenticator;

    for chunk in encrypted.chunks(16) {
        let mut context = md5::Context::new();
        context.consume(secret);
        context.consume(previous_block);
        let hash = context.compute();

        result.extend(chunk.iter().zip(hash.0.iter()).map(|(c, h)| c ^ h));
        previous_block = chunk;
    }

    while result.last() == Some(&0) {
        result.pop();
    }

    String::from_utf8(result)
        .map_err(|e| PacketError::AttributeError(format!("Invalid UTF-8 in password: {}", e)))
}
