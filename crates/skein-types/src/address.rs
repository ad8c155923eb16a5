//! Fixed-width next-hop addresses.
//!
//! Every hop address inside a decrypted layer is exactly [`ADDRESS_WIDTH`]
//! ASCII decimal digits, zero padded, encoding `base_port + id`. Relays and
//! destinations share this format, so a relay never needs to know whether it
//! is the exit hop.
//!
//! Parsing is length driven: the first ten bytes are the address and
//! everything after them is payload, even when the payload itself starts
//! with digits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::network::NodeId;
use crate::{DEFAULT_RELAY_BASE_PORT, DEFAULT_USER_BASE_PORT};

/// Width of an encoded address in bytes.
pub const ADDRESS_WIDTH: usize = 10;

/// Largest value representable in [`ADDRESS_WIDTH`] digits.
pub const MAX_ADDRESS: u64 = 9_999_999_999;

/// Errors from decoding an address field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// Fewer than [`ADDRESS_WIDTH`] bytes were available.
    #[error("address field truncated: need {ADDRESS_WIDTH} bytes, got {0}")]
    Truncated(usize),

    /// A byte in the field is not an ASCII digit.
    #[error("address byte {position} is not a decimal digit (0x{byte:02x})")]
    NotDigit { position: usize, byte: u8 },

    /// The address does not fit the requested representation.
    #[error("address {0} out of range")]
    OutOfRange(u64),
}

/// A network endpoint identifier: `base_port + id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address {
    /// Create an address, checking it fits in [`ADDRESS_WIDTH`] digits.
    pub fn new(value: u64) -> Result<Self, AddressError> {
        if value > MAX_ADDRESS {
            return Err(AddressError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// The numeric value of this address.
    pub fn value(self) -> u64 {
        self.0
    }

    /// Interpret the address as a TCP/UDP port.
    pub fn port(self) -> Result<u16, AddressError> {
        u16::try_from(self.0).map_err(|_| AddressError::OutOfRange(self.0))
    }

    /// Encode as ten zero-padded ASCII digits.
    pub fn encode(self) -> [u8; ADDRESS_WIDTH] {
        let mut out = [b'0'; ADDRESS_WIDTH];
        let mut rest = self.0;
        for slot in out.iter_mut().rev() {
            // Each digit is < 10, so the cast is lossless.
            *slot = b'0' + (rest % 10) as u8;
            rest /= 10;
        }
        out
    }

    /// Decode exactly the leading [`ADDRESS_WIDTH`] bytes of `field`.
    pub fn parse(field: &[u8]) -> Result<Self, AddressError> {
        let digits = field
            .get(..ADDRESS_WIDTH)
            .ok_or(AddressError::Truncated(field.len()))?;

        let mut value = 0u64;
        for (position, &byte) in digits.iter().enumerate() {
            if !byte.is_ascii_digit() {
                return Err(AddressError::NotDigit { position, byte });
            }
            value = value * 10 + u64::from(byte - b'0');
        }
        Ok(Self(value))
    }

    /// Split `plain` into its leading address and the remaining payload.
    pub fn split_prefix(plain: &[u8]) -> Result<(Self, &[u8]), AddressError> {
        let address = Self::parse(plain)?;
        Ok((address, &plain[ADDRESS_WIDTH..]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

/// Maps relay and user identifiers onto addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPlan {
    pub relay_base: u16,
    pub user_base: u16,
}

impl AddressPlan {
    pub fn new(relay_base: u16, user_base: u16) -> Self {
        Self {
            relay_base,
            user_base,
        }
    }

    /// Address of relay `id`.
    pub fn relay(&self, id: NodeId) -> Address {
        Address(u64::from(self.relay_base) + u64::from(id.0))
    }

    /// Address of user `id`.
    pub fn user(&self, id: NodeId) -> Address {
        Address(u64::from(self.user_base) + u64::from(id.0))
    }
}

impl Default for AddressPlan {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_BASE_PORT, DEFAULT_USER_BASE_PORT)
    }
}
