//! RADIUS Access-Request codec
//!
//! This crate implements the subset of RADIUS a NAS needs to authenticate a
//! user against a RADIUS server, as defined in RFC 2865, 2548, 2759 and 3579.
//!
//! # Features
//!
//! - Packet and attribute encoding and decoding
//! - MD5-based User-Password hiding (PAP)
//! - MS-CHAPv2 NT-Response generation with Microsoft vendor attributes
//! - Request/Response Authenticator calculation
//! - Message-Authenticator signing and verification
//!
//! # Example
//!
//! ```rust
//! use authgw_radius::{AccessRequestBuilder, AuthMethod, NasIdentity};
//!
//! let nas = NasIdentity {
//!     identifier: Some("gateway".to_string()),
//!     ..NasIdentity::default()
//! };
//!
//! let request = AccessRequestBuilder::new(&nas, b"secret", AuthMethod::MsChapV2, "alice", "password")
//!     .calling_station_id("192.0.2.10")
//!     .message_authenticator(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(request.encoded.len(), request.packet.length());
//! ```

pub mod attributes;
pub mod auth;
pub mod message_auth;
pub mod mschapv2;
pub mod packet;
pub mod reply;
pub mod request;

pub use attributes::{Attribute, AttributeType};
pub use auth::{
    calculate_response_authenticator, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator, verify_response_authenticator,
};
pub use message_auth::{calculate_message_authenticator, verify_message_authenticator};
pub use mschapv2::{MsChap2Response, MsChapError, generate_nt_response, verify_nt_response};
pub use packet::{Code, Packet, PacketError};
pub use reply::{AccessReply, ReplyError, interpret_reply};
pub use request::{AccessRequest, AccessRequestBuilder, AuthMethod, DEFAULT_NAS_PORT, NasIdentity};
