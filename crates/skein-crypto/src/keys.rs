//! X25519 relay identity keys (RFC 7748) and their transportable text form.
//!
//! A relay generates one [`KeyPair`] at startup and never rotates it. The
//! public half is published to the directory as base64 text; the private
//! half stays with the relay (it can be exported for debugging only).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Size of an X25519 key in bytes.
pub const KEY_SIZE: usize = 32;

/// An X25519 static secret key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: StaticSecret,
}

/// An X25519 public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey {
    bytes: [u8; KEY_SIZE],
}

/// An X25519 shared secret.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; KEY_SIZE],
}

/// A relay's long-lived key pair.
#[derive(Clone)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        let private = PrivateKey::random();
        Self {
            public: private.public_key(),
            private,
        }
    }

    /// Rebuild a key pair from its private half.
    pub fn from_private(private: PrivateKey) -> Self {
        Self {
            public: private.public_key(),
            private,
        }
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn private(&self) -> &PrivateKey {
        &self.private
    }
}

impl PrivateKey {
    /// Generate a new random static secret.
    pub fn random() -> Self {
        Self {
            inner: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self {
            inner: StaticSecret::from(bytes),
        }
    }

    /// Get the raw bytes of this secret.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.inner.to_bytes()
    }

    /// Compute the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        let pk = DalekPublicKey::from(&self.inner);
        PublicKey {
            bytes: pk.to_bytes(),
        }
    }

    /// Perform Diffie-Hellman key agreement.
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        let pk = DalekPublicKey::from(their_public.bytes);
        let shared = self.inner.diffie_hellman(&pk);
        SharedSecret {
            bytes: *shared.as_bytes(),
        }
    }

    /// Export as base64 text.
    pub fn to_text(&self) -> String {
        let mut bytes = self.to_bytes();
        let text = STANDARD.encode(bytes);
        bytes.zeroize();
        text
    }

    /// Import from the base64 text produced by [`PrivateKey::to_text`].
    pub fn from_text(text: &str) -> Result<Self> {
        let mut bytes = decode_key(text)?;
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        Ok(key)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Get the raw bytes.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.bytes
    }

    /// Get the raw bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Export as base64 text, the form published to the directory.
    pub fn to_text(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    /// Import from the base64 text produced by [`PublicKey::to_text`].
    pub fn from_text(text: &str) -> Result<Self> {
        decode_key(text).map(Self::from_bytes)
    }
}

impl SharedSecret {
    /// Get the raw bytes of the shared secret.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

/// Compute X25519 basepoint multiplication (public key from secret).
pub fn basepoint_mult(secret: &[u8; KEY_SIZE]) -> [u8; KEY_SIZE] {
    let sk = StaticSecret::from(*secret);
    let pk = DalekPublicKey::from(&sk);
    pk.to_bytes()
}

fn decode_key(text: &str) -> Result<[u8; KEY_SIZE]> {
    let raw = STANDARD
        .decode(text.trim())
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
    <[u8; KEY_SIZE]>::try_from(raw.as_slice()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_SIZE,
        actual: raw.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let pair = KeyPair::generate();
        assert_ne!(pair.public().to_bytes(), [0u8; KEY_SIZE]);
        assert_eq!(pair.private().public_key(), *pair.public());
    }

    #[test]
    fn test_diffie_hellman_agreement() {
        let alice = PrivateKey::random();
        let bob = PrivateKey::random();

        let alice_shared = alice.diffie_hellman(&bob.public_key());
        let bob_shared = bob.diffie_hellman(&alice.public_key());

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_public_key_text_roundtrip() {
        let pair = KeyPair::generate();
        let text = pair.public().to_text();
        let restored = PublicKey::from_text(&text).expect("import public key");
        assert_eq!(&restored, pair.public());
    }

    #[test]
    fn test_private_key_text_roundtrip() {
        let pair = KeyPair::generate();
        let text = pair.private().to_text();
        let restored = PrivateKey::from_text(&text).expect("import private key");
        assert_eq!(restored.public_key(), *pair.public());
    }

    #[test]
    fn test_export_is_deterministic() {
        let pair = KeyPair::generate();
        assert_eq!(pair.public().to_text(), pair.public().to_text());
        assert_eq!(pair.private().to_text(), pair.private().to_text());
    }

    #[test]
    fn test_from_text_rejects_garbage() {
        assert!(matches!(
            PublicKey::from_text("not base64 at all!"),
            Err(CryptoError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_from_text_rejects_wrong_length() {
        let short = STANDARD.encode([1u8; 16]);
        assert!(matches!(
            PublicKey::from_text(&short),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let key = PrivateKey::random();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(&key.to_text()));
    }

    #[test]
    fn test_rfc7748_section6_1() {
        let alice_private =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .expect("valid hex");
        let alice_public =
            hex::decode("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
                .expect("valid hex");

        let mut secret_bytes = [0u8; KEY_SIZE];
        secret_bytes.copy_from_slice(&alice_private);
        let computed_pk = basepoint_mult(&secret_bytes);
        assert_eq!(computed_pk.as_slice(), alice_public.as_slice());
    }
}
