//! Per-hop symmetric keys and ChaCha20-Poly1305 AEAD (RFC 8439).
//!
//! [`seal`] / [`open`] carry a hop body of arbitrary length. Each sealed body
//! is `nonce (12) || ciphertext || tag (16)` with a fresh random nonce, so a
//! body can be opened with nothing but the key.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Key size for ChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Authentication tag size (128 bits = 16 bytes).
pub const TAG_SIZE: usize = 16;

/// Fixed overhead added by [`seal`].
pub const SEAL_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// Symmetric key material for one hop of one circuit.
///
/// Wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Generate fresh, independent key material from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Create from a slice, which must be exactly [`KEY_SIZE`] bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let bytes = <[u8; KEY_SIZE]>::try_from(raw).map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: raw.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Export the raw key bytes (the form wrapped with ECIES).
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Encrypt data with ChaCha20-Poly1305.
///
/// Returns ciphertext with appended 16-byte authentication tag. The nonce
/// must never be reused with the same key.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(nonce);

    cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadEncryption)
}

/// Decrypt data with ChaCha20-Poly1305.
///
/// Fails with [`CryptoError::AeadDecryption`] if the tag does not verify.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(nonce);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// Output layout: `nonce || ciphertext || tag`.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = encrypt(key.as_bytes(), &nonce, plaintext, &[])?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a body produced by [`seal`].
pub fn open(key: &SymmetricKey, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < SEAL_OVERHEAD {
        return Err(CryptoError::CiphertextTooShort {
            min: SEAL_OVERHEAD,
            actual: sealed.len(),
        });
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(nonce);

    decrypt(key.as_bytes(), &nonce_bytes, ciphertext, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [0x42u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];

        let ciphertext = encrypt(&key, &nonce, b"hop body", b"aad").expect("encrypt");
        let decrypted = decrypt(&key, &nonce, &ciphertext, b"aad").expect("decrypt");

        assert_eq!(decrypted, b"hop body");
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = [0x01u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];

        let ciphertext = encrypt(&key, &nonce, b"test", b"aad1").expect("encrypt");
        assert!(decrypt(&key, &nonce, &ciphertext, b"aad2").is_err());
    }

    #[test]
    fn test_seal_open() {
        let key = SymmetricKey::generate();
        let sealed = seal(&key, b"0000004012payload").expect("seal");
        assert_eq!(sealed.len(), 17 + SEAL_OVERHEAD);

        let opened = open(&key, &sealed).expect("open");
        assert_eq!(opened, b"0000004012payload");
    }

    #[test]
    fn test_seal_uses_fresh_nonce() {
        let key = SymmetricKey::generate();
        let a = seal(&key, b"same").expect("seal");
        let b = seal(&key, b"same").expect("seal");
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let sealed = seal(&SymmetricKey::generate(), b"secret").expect("seal");
        assert!(matches!(
            open(&SymmetricKey::generate(), &sealed),
            Err(CryptoError::AeadDecryption)
        ));
    }

    #[test]
    fn test_open_tampered_fails() {
        let key = SymmetricKey::generate();
        let mut sealed = seal(&key, b"secret").expect("seal");
        if let Some(byte) = sealed.last_mut() {
            *byte ^= 0x01;
        }
        assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn test_open_too_short() {
        let key = SymmetricKey::generate();
        assert!(matches!(
            open(&key, &[0u8; 10]),
            Err(CryptoError::CiphertextTooShort { min: 28, actual: 10 })
        ));
    }

    #[test]
    fn test_generated_keys_independent() {
        assert_ne!(SymmetricKey::generate(), SymmetricKey::generate());
    }

    #[test]
    fn test_from_slice_length_checked() {
        assert!(SymmetricKey::from_slice(&[0u8; KEY_SIZE]).is_ok());
        assert!(matches!(
            SymmetricKey::from_slice(&[0u8; 31]),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 31
            })
        ));
    }
}
