//! # skein-crypto
//!
//! Key service for the Skein relay network.
//!
//! Every relay owns a long-lived X25519 key pair. Senders wrap one fresh
//! symmetric key per hop to the relay's public key with ECIES, and encrypt
//! the hop body with ChaCha20-Poly1305 under that symmetric key. The suite is
//! fixed; there is no negotiation.
//!
//! ## Modules
//!
//! - [`keys`] - X25519 key pairs and their base64 text form
//! - [`ecies`] - Asymmetric wrapping of short key material
//! - [`symmetric`] - Per-hop symmetric keys and body encryption
//! - [`blake3`] - Domain-separated key derivation used by ECIES

pub mod blake3;
pub mod ecies;
pub mod keys;
pub mod symmetric;

pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use symmetric::SymmetricKey;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    AeadEncryption,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// ECIES encryption/decryption failed.
    #[error("ECIES error: {0}")]
    Ecies(String),

    /// Text form of a key or ciphertext could not be decoded.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Ciphertext is shorter than the scheme's fixed overhead.
    #[error("ciphertext too short: need at least {min}, got {actual}")]
    CiphertextTooShort { min: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, CryptoError>;
