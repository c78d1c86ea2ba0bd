//! MS-CHAPv2 client computations (RFC 2759) and the RADIUS encoding of the
//! response (RFC 2548 Section 2.3.2)
//!
//! Only the NAS side is needed here: given the authenticator and peer
//! challenges, derive the 24-byte NT-Response that the RADIUS server checks.
//!
//! ```text
//! ChallengeHash  = SHA1(PeerChallenge | AuthenticatorChallenge | UserName)[0..8]
//! PasswordHash   = MD4(UTF-16LE(Password))
//! NT-Response    = DES(Z[0..7],  ChallengeHash)
//!                | DES(Z[7..14], ChallengeHash)
//!                | DES(Z[14..21],ChallengeHash)     Z = PasswordHash | 0x00 * 5
//! ```

use des::Des;
use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockEncrypt, KeyInit};
use md4::Md4;
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Length of the authenticator and peer challenges
pub const CHALLENGE_LENGTH: usize = 16;
/// Length of the NT-Response
pub const NT_RESPONSE_LENGTH: usize = 24;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MsChapError {
    #[error("Invalid MS-CHAP2-Response length: expected 50 bytes, got {0}")]
    InvalidLength(usize),
}

/// First eight bytes of SHA1(peer challenge, authenticator challenge, user name)
pub fn challenge_hash(
    peer_challenge: &[u8; CHALLENGE_LENGTH],
    authenticator_challenge: &[u8; CHALLENGE_LENGTH],
    username: &str,
) -> [u8; 8] {
    let mut hasher = Sha1::new();
    hasher.update(peer_challenge);
    hasher.update(authenticator_challenge);
    hasher.update(username.as_bytes());
    let digest = hasher.finalize();

    let mut challenge = [0u8; 8];
    challenge.copy_from_slice(&digest[..8]);
    challenge
}

/// MD4 over the UTF-16LE encoding of the password
pub fn nt_password_hash(password: &str) -> [u8; 16] {
    let unicode: Vec<u8> = password
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    let digest = Md4::digest(&unicode);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&digest);
    hash
}

/// Spread 56 key bits over eight bytes, leaving the DES parity bit clear
fn des_key(bits: &[u8]) -> [u8; 8] {
    [
        bits[0] & 0xFE,
        (bits[0] << 7) | (bits[1] >> 1),
        (bits[1] << 6) | (bits[2] >> 2),
        (bits[2] << 5) | (bits[3] >> 3),
        (bits[3] << 4) | (bits[4] >> 4),
        (bits[4] << 3) | (bits[5] >> 5),
        (bits[5] << 2) | (bits[6] >> 6),
        bits[6] << 1,
    ]
}

/// Encrypt the challenge with each third of the zero-padded password hash
pub fn challenge_response(challenge: &[u8; 8], password_hash: &[u8; 16]) -> [u8; NT_RESPONSE_LENGTH] {
    let mut padded = [0u8; 21];
    padded[..16].copy_from_slice(password_hash);

    let mut response = [0u8; NT_RESPONSE_LENGTH];
    for (key_bits, out) in padded.chunks(7).zip(response.chunks_mut(8)) {
        let key = des_key(key_bits);
        let cipher = Des::new(GenericArray::from_slice(&key));
        let mut block = GenericArray::clone_from_slice(challenge);
        cipher.encrypt_block(&mut block);
        out.copy_from_slice(&block);
    }
    response
}

/// GenerateNTResponse (RFC 2759 Section 8.1)
pub fn generate_nt_response(
    authenticator_challenge: &[u8; CHALLENGE_LENGTH],
    peer_challenge: &[u8; CHALLENGE_LENGTH],
    username: &str,
    password: &str,
) -> [u8; NT_RESPONSE_LENGTH] {
    let challenge = challenge_hash(peer_challenge, authenticator_challenge, username);
    let password_hash = nt_password_hash(password);
    challenge_response(&challenge, &password_hash)
}

/// Recompute the NT-Response the way a RADIUS server does and compare
pub fn verify_nt_response(
    authenticator_challenge: &[u8; CHALLENGE_LENGTH],
    response: &MsChap2Response,
    username: &str,
    password: &str,
) -> bool {
    generate_nt_response(
        authenticator_challenge,
        &response.peer_challenge,
        username,
        password,
    ) == response.nt_response
}

/// Value of the Microsoft MS-CHAP2-Response vendor attribute
///
/// ```text
/// Ident (1) | Flags (1) | Peer-Challenge (16) | Reserved (8) | NT-Response (24)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsChap2Response {
    pub ident: u8,
    pub flags: u8,
    pub peer_challenge: [u8; CHALLENGE_LENGTH],
    pub nt_response: [u8; NT_RESPONSE_LENGTH],
}

impl MsChap2Response {
    pub const LENGTH: usize = 50;
    /// Ident/flags pair sent by the gateway: ASCII "1" and "0"
    pub const DEFAULT_IDENT: u8 = b'1';
    pub const DEFAULT_FLAGS: u8 = b'0';

    pub fn new(peer_challenge: [u8; CHALLENGE_LENGTH], nt_response: [u8; NT_RESPONSE_LENGTH]) -> Self {
        MsChap2Response {
            ident: Self::DEFAULT_IDENT,
            flags: Self::DEFAULT_FLAGS,
            peer_challenge,
            nt_response,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LENGTH);
        bytes.push(self.ident);
        bytes.push(self.flags);
        bytes.extend_from_slice(&self.peer_challenge);
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend_from_slice(&self.nt_response);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MsChapError> {
        if bytes.len() != Self::LENGTH {
            return Err(MsChapError::InvalidLength(bytes.len()));
        }

        let mut peer_challenge = [0u8; CHALLENGE_LENGTH];
        peer_challenge.copy_from_slice(&bytes[2..18]);
        let mut nt_response = [0u8; NT_RESPONSE_LENGTH];
        nt_response.copy_from_slice(&bytes[26..50]);

        Ok(MsChap2Response {
            ident: bytes[0],
            flags: bytes[1],
            peer_challenge,
            nt_response,
        })
    }
}
