//! ECIES-X25519-ChaCha20-BLAKE3 encryption.
//!
//! Wraps short key material (one hop's [`SymmetricKey`](crate::SymmetricKey))
//! to a relay's public key. Ciphertext length is `32 + plaintext + 16`, so a
//! wrapped 32-byte key always occupies [`WRAPPED_KEY_LEN`] bytes.
//!
//! ## Algorithm
//!
//! ```text
//! ECIES.Encrypt(recipient_pk, plaintext; randomness):
//!   1. eph_sk = randomness
//!   2. eph_pk = X25519_basepoint_mult(eph_sk)
//!   3. shared_secret = X25519(eph_sk, recipient_pk)
//!   4. enc_key = BLAKE3::derive_key("Skein v1 ecies-encryption-key",
//!               shared_secret || eph_pk || recipient_pk)
//!   5. nonce = BLAKE3::derive_key("Skein v1 ecies-nonce",
//!             shared_secret || eph_pk)[:12]
//!   6. ciphertext = ChaCha20-Poly1305.Encrypt(enc_key, nonce, plaintext, aad=eph_pk)
//!   7. return (eph_pk || ciphertext || tag)
//! ```

use rand::RngCore;
use zeroize::Zeroize;

use crate::blake3::{self, contexts};
use crate::keys::{self, PrivateKey, PublicKey};
use crate::symmetric::{self, TAG_SIZE};
use crate::{CryptoError, Result};

/// Size of the ephemeral public key prefix.
pub const EPH_PK_SIZE: usize = 32;

/// Fixed overhead of an ECIES ciphertext.
pub const OVERHEAD: usize = EPH_PK_SIZE + TAG_SIZE;

/// Length of a wrapped 32-byte symmetric key.
pub const WRAPPED_KEY_LEN: usize = ciphertext_len(symmetric::KEY_SIZE);

/// Ciphertext length for a plaintext of `plaintext_len` bytes.
pub const fn ciphertext_len(plaintext_len: usize) -> usize {
    OVERHEAD + plaintext_len
}

/// ECIES ciphertext: ephemeral public key + ciphertext + tag.
pub struct EciesCiphertext {
    /// The ephemeral public key (32 bytes).
    pub eph_pk: [u8; EPH_PK_SIZE],
    /// The ciphertext with appended Poly1305 tag.
    pub ciphertext_and_tag: Vec<u8>,
}

impl EciesCiphertext {
    /// Serialize to bytes: eph_pk || ciphertext || tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EPH_PK_SIZE + self.ciphertext_and_tag.len());
        out.extend_from_slice(&self.eph_pk);
        out.extend_from_slice(&self.ciphertext_and_tag);
        out
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < OVERHEAD {
            return Err(CryptoError::Ecies("ciphertext too short".into()));
        }
        let mut eph_pk = [0u8; EPH_PK_SIZE];
        eph_pk.copy_from_slice(&data[..EPH_PK_SIZE]);
        Ok(Self {
            eph_pk,
            ciphertext_and_tag: data[EPH_PK_SIZE..].to_vec(),
        })
    }
}

/// Encrypt using ECIES with explicit randomness.
///
/// # Arguments
///
/// * `recipient_pk` - Recipient's X25519 public key
/// * `plaintext` - Data to encrypt
/// * `randomness` - 32 bytes of randomness for ephemeral key generation
pub fn encrypt_deterministic(
    recipient_pk: &PublicKey,
    plaintext: &[u8],
    randomness: &[u8; 32],
) -> Result<EciesCiphertext> {
    let eph_pk_bytes = keys::basepoint_mult(randomness);

    let eph_secret = PrivateKey::from_bytes(*randomness);
    let shared_secret = eph_secret.diffie_hellman(recipient_pk);

    let (mut enc_key, nonce) = derive_key_and_nonce(
        shared_secret.as_bytes(),
        &eph_pk_bytes,
        recipient_pk.as_bytes(),
    );

    let ciphertext_and_tag = symmetric::encrypt(&enc_key, &nonce, plaintext, &eph_pk_bytes);
    enc_key.zeroize();

    Ok(EciesCiphertext {
        eph_pk: eph_pk_bytes,
        ciphertext_and_tag: ciphertext_and_tag?,
    })
}

/// Encrypt using ECIES with a random ephemeral key.
pub fn encrypt(recipient_pk: &PublicKey, plaintext: &[u8]) -> Result<EciesCiphertext> {
    let mut randomness = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut randomness);
    let ct = encrypt_deterministic(recipient_pk, plaintext, &randomness);
    randomness.zeroize();
    ct
}

/// Encrypt to a public key given in its directory text form.
pub fn encrypt_to_text_key(recipient_pk_text: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let recipient_pk = PublicKey::from_text(recipient_pk_text)?;
    encrypt(&recipient_pk, plaintext).map(|ct| ct.to_bytes())
}

/// Decrypt an ECIES ciphertext.
///
/// Fails with [`CryptoError::AeadDecryption`] when `recipient_sk` is not the
/// key the ciphertext was made for.
pub fn decrypt(recipient_sk: &PrivateKey, ciphertext: &EciesCiphertext) -> Result<Vec<u8>> {
    let eph_pk = PublicKey::from_bytes(ciphertext.eph_pk);
    let recipient_pk = recipient_sk.public_key();

    let shared_secret = recipient_sk.diffie_hellman(&eph_pk);

    let (mut enc_key, nonce) = derive_key_and_nonce(
        shared_secret.as_bytes(),
        &ciphertext.eph_pk,
        recipient_pk.as_bytes(),
    );

    let plaintext = symmetric::decrypt(
        &enc_key,
        &nonce,
        &ciphertext.ciphertext_and_tag,
        &ciphertext.eph_pk,
    );
    enc_key.zeroize();
    plaintext
}

/// Decrypt serialized ECIES bytes (`eph_pk || ciphertext || tag`).
pub fn decrypt_bytes(recipient_sk: &PrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    decrypt(recipient_sk, &EciesCiphertext::from_bytes(data)?)
}

fn derive_key_and_nonce(
    shared_secret: &[u8; 32],
    eph_pk: &[u8; 32],
    recipient_pk: &[u8; 32],
) -> ([u8; 32], [u8; symmetric::NONCE_SIZE]) {
    let mut key_material = Vec::with_capacity(32 + 32 + 32);
    key_material.extend_from_slice(shared_secret);
    key_material.extend_from_slice(eph_pk);
    key_material.extend_from_slice(recipient_pk);
    let enc_key = blake3::derive_key(contexts::ECIES_ENCRYPTION_KEY, &key_material);
    key_material.zeroize();

    let mut nonce_material = Vec::with_capacity(32 + 32);
    nonce_material.extend_from_slice(shared_secret);
    nonce_material.extend_from_slice(eph_pk);
    let nonce_full = blake3::derive_key(contexts::ECIES_NONCE, &nonce_material);
    nonce_material.zeroize();

    let mut nonce = [0u8; symmetric::NONCE_SIZE];
    nonce.copy_from_slice(&nonce_full[..symmetric::NONCE_SIZE]);
    (enc_key, nonce)
}
