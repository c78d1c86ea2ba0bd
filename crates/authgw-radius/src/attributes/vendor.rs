//! Vendor-Specific attributes (RFC 2865 Section 5.26)
//!
//! Only the single-sub-attribute layout recommended by the RFC is produced:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |  Length       |            Vendor-Id
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!      Vendor-Id (cont)           | Vendor type   | Vendor length |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Attribute-Specific...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use super::{Attribute, AttributeType};
use crate::packet::PacketError;

/// IANA private enterprise number of Microsoft (RFC 2548)
pub const MICROSOFT_VENDOR_ID: u32 = 311;

/// Microsoft vendor attribute types used for MS-CHAPv2 (RFC 2548)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsAttributeType {
    /// MS-CHAP-Challenge (11)
    ChapChallenge = 11,
    /// MS-CHAP2-Response (25)
    Chap2Response = 25,
}

/// A decoded vendor sub-attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSpecific {
    pub vendor_id: u32,
    pub vendor_type: u8,
    pub value: Vec<u8>,
}

impl VendorSpecific {
    /// Vendor-Id (4) + vendor type (1) + vendor length (1)
    const HEADER_LENGTH: usize = 6;

    pub fn new(vendor_id: u32, vendor_type: u8, value: Vec<u8>) -> Self {
        VendorSpecific {
            vendor_id,
            vendor_type,
            value,
        }
    }

    /// Microsoft sub-attribute
    pub fn microsoft(vendor_type: MsAttributeType, value: Vec<u8>) -> Self {
        Self::new(MICROSOFT_VENDOR_ID, vendor_type as u8, value)
    }

    /// Wrap into a Vendor-Specific (26) attribute
    pub fn to_attribute(&self) -> Result<Attribute, PacketError> {
        if self.value.len() + Self::HEADER_LENGTH > Attribute::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Vendor attribute value too long: {} bytes",
                self.value.len()
            )));
        }

        let mut value = Vec::with_capacity(Self::HEADER_LENGTH + self.value.len());
        value.extend_from_slice(&self.vendor_id.to_be_bytes());
        value.push(self.vendor_type);
        value.push((self.value.len() + 2) as u8);
        value.extend_from_slice(&self.value);

        Attribute::new(AttributeType::VendorSpecific as u8, value)
    }

    /// Parse the first sub-attribute of a Vendor-Specific attribute
    pub fn from_attribute(attr: &Attribute) -> Result<Self, PacketError> {
        if attr.attr_type != AttributeType::VendorSpecific as u8 {
            return Err(PacketError::AttributeError(format!(
                "Attribute type {} is not Vendor-Specific",
                attr.attr_type
            )));
        }

        let data = &attr.value;
        if data.len() < Self::HEADER_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Vendor-Specific attribute too short: {} bytes",
                data.len()
            )));
        }

        let vendor_id = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let vendor_type = data[4];
        let vendor_length = data[5] as usize;

        if vendor_length < 2 || 4 + vendor_length > data.len() {
            return Err(PacketError::AttributeError(format!(
                "Invalid vendor sub-attribute length: {}",
                vendor_length
            )));
        }

        Ok(VendorSpecific {
            vendor_id,
            vendor_type,
            value: data[Self::HEADER_LENGTH..4 + vendor_length].to_vec(),
        })
    }

    pub fn is_microsoft(&self, vendor_type: MsAttributeType) -> bool {
        self.vendor_id == MICROSOFT_VENDOR_ID && self.vendor_type == vendor_type as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microsoft_challenge_layout() {
        let vsa = VendorSpecific::microsoft(MsAttributeType::ChapChallenge, vec![0xAA; 16]);
        let attr = vsa.to_attribute().unwrap();

        assert_eq!(attr.attr_type, 26);
        assert_eq!(attr.value.len(), 22);
        assert_eq!(&attr.value[0..4], &[0, 0, 1, 55]);
        assert_eq!(attr.value[4], 11);
        assert_eq!(attr.value[5], 18);
        assert_eq!(&attr.value[6..], &[0xAA; 16]);

        let parsed = VendorSpecific::from_attribute(&attr).unwrap();
        assert!(parsed.is_microsoft(MsAttributeType::ChapChallenge));
        assert_eq!(parsed.value, vec![0xAA; 16]);
    }

    #[test]
    fn test_reject_bad_vendor_length() {
        let attr = Attribute::new(26, vec![0, 0, 1, 55, 25, 60, 1, 2]).unwrap();
        assert!(VendorSpecific::from_attribute(&attr).is_err());

        let not_vsa = Attribute::new(1, vec![0; 8]).unwrap();
        assert!(VendorSpecific::from_attribute(&not_vsa).is_err());
    }
}
