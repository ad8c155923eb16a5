//! # skein-types
//!
//! Shared domain types used across the Skein workspace.

pub mod address;
pub mod network;

pub use address::{Address, AddressError, AddressPlan, ADDRESS_WIDTH};
pub use network::{NodeId, RelayRecord};

/// Number of relays in every circuit.
pub const CIRCUIT_HOPS: usize = 3;

/// Default port of the relay directory.
pub const DEFAULT_REGISTRY_PORT: u16 = 8080;

/// Default base port for relays (`relay address = base + id`).
pub const DEFAULT_RELAY_BASE_PORT: u16 = 4000;

/// Default base port for users (`user address = base + id`).
pub const DEFAULT_USER_BASE_PORT: u16 = 3000;
