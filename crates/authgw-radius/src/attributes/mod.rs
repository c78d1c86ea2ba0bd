#[allow(clippy::module_inception)]
mod attribute;
mod types;
pub mod vendor;

pub use attribute::Attribute;
pub use types::{AttributeType, NasPortType};
pub use vendor::{MICROSOFT_VENDOR_ID, MsAttributeType, VendorSpecific};
