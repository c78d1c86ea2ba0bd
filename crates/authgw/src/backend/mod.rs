//! Backend clients, one per supported directory family

pub mod ldap;
pub mod radius;

pub use ldap::{Directory, DirectorySettings, LdapBackend, bind_search_bind};
pub use radius::RadiusBackend;
