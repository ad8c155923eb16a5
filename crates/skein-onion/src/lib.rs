//! # skein-onion
//!
//! Onion construction and relay forwarding for the Skein network.
//!
//! A sender picks a 3-hop circuit from the directory, wraps the message in
//! one layer per hop, and hands the result to the entry relay. Each relay
//! removes exactly one layer and forwards what is left to the address it
//! finds inside.
//!
//! - [`layer`] - Sealing and peeling a single layer
//! - [`circuit`] - Relay selection, circuit construction and wrapping
//! - [`relay`] - Unwrap-and-forward state held by a relay
//! - [`user`] - Sender and destination endpoint
//! - [`net`] - Transport and directory seams, plus an in-process mailbox
//! - [`observe`] - Last-value introspection cells
//!
//! ## Layer Format
//!
//! | Segment | Size |
//! |---|---|
//! | ECIES-wrapped hop key | 80 bytes |
//! | Body nonce | 12 bytes |
//! | Body ciphertext: next hop address ++ inner payload | 10 + n bytes |
//! | Body tag | 16 bytes |

pub mod circuit;
pub mod layer;
pub mod net;
pub mod observe;
pub mod relay;
pub mod user;

pub use circuit::{Circuit, CircuitBuilder, HopInfo};
pub use net::{Mailbox, RelayDirectory, Transport};
pub use relay::Relay;
pub use user::UserNode;

pub use skein_types::CIRCUIT_HOPS;

/// Error types for onion routing operations.
#[derive(Debug, thiserror::Error)]
pub enum OnionError {
    /// A request field is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Not enough distinct relays available to construct a circuit.
    #[error("insufficient relays: need {need}, have {have}")]
    InsufficientRelays { need: usize, have: usize },

    /// Circuit construction failed.
    #[error("circuit construction failed: {0}")]
    CircuitConstruction(String),

    /// Directory rejected or failed a request.
    #[error("directory error: {0}")]
    Directory(#[from] skein_directory::DirectoryError),

    /// Cryptographic error from skein-crypto.
    #[error("crypto error: {0}")]
    Crypto(#[from] skein_crypto::CryptoError),

    /// Malformed onion structure.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Next hop unreachable or refused the payload.
    #[error("network error: {0}")]
    Network(String),
}

impl From<skein_types::AddressError> for OnionError {
    fn from(err: skein_types::AddressError) -> Self {
        OnionError::Protocol(err.to_string())
    }
}

/// Convenience result type for onion routing operations.
pub type Result<T> = std::result::Result<T, OnionError>;
