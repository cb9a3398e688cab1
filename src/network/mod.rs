//! Local network discovery

pub mod address;

pub use address::{AddressResolver, InterfaceAddress, InterfaceProvider, SystemInterfaces, is_private_ipv4};
