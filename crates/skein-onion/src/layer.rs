//! Sealing and peeling a single onion layer.
//!
//! ```text
//! layer = ECIES(relay_pk, hop_key)          // ENCRYPTED_KEY_LEN bytes
//!      ++ seal(hop_key, next_hop ++ inner)  // nonce || ciphertext || tag
//! ```
//!
//! `next_hop` is the fixed-width address of whoever receives `inner`.

use skein_crypto::ecies;
use skein_crypto::symmetric::{self, SEAL_OVERHEAD};
use skein_crypto::{PrivateKey, PublicKey, SymmetricKey};
use skein_types::{Address, ADDRESS_WIDTH};
use zeroize::Zeroize;

use crate::{OnionError, Result};

/// Length of the wrapped hop key at the front of every layer.
pub const ENCRYPTED_KEY_LEN: usize = ecies::WRAPPED_KEY_LEN;

/// Smallest possible layer: wrapped key plus a body carrying only an address.
pub const MIN_LAYER_LEN: usize = ENCRYPTED_KEY_LEN + SEAL_OVERHEAD + ADDRESS_WIDTH;

/// The result of removing one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeledLayer {
    /// Where `inner` must be sent.
    pub next_hop: Address,
    /// The next layer, or the plaintext message at the exit hop.
    pub inner: Vec<u8>,
}

/// Wrap `inner` for the relay owning `public_key`, under `hop_key`.
pub fn seal_layer(
    hop_key: &SymmetricKey,
    public_key: &PublicKey,
    next_hop: Address,
    inner: &[u8],
) -> Result<Vec<u8>> {
    seal_with_header(hop_key, public_key, &next_hop.encode(), inner)
}

fn seal_with_header(
    hop_key: &SymmetricKey,
    public_key: &PublicKey,
    header: &[u8],
    inner: &[u8],
) -> Result<Vec<u8>> {
    let mut plain = Vec::with_capacity(header.len() + inner.len());
    plain.extend_from_slice(header);
    plain.extend_from_slice(inner);

    let body = symmetric::seal(hop_key, &plain)?;
    let encrypted_key = ecies::encrypt(public_key, hop_key.as_bytes())?.to_bytes();
    if encrypted_key.len() != ENCRYPTED_KEY_LEN {
        return Err(OnionError::Protocol(format!(
            "wrapped key is {} bytes, expected {ENCRYPTED_KEY_LEN}",
            encrypted_key.len()
        )));
    }

    let mut layer = Vec::with_capacity(encrypted_key.len() + body.len());
    layer.extend_from_slice(&encrypted_key);
    layer.extend_from_slice(&body);
    Ok(layer)
}

/// Remove one layer with the relay's private key.
///
/// Errors:
/// - [`OnionError::Protocol`] if the payload is too short to be a layer or
///   the address field is not ten ASCII digits
/// - [`OnionError::Crypto`] if the key or body does not decrypt
pub fn peel_layer(private_key: &PrivateKey, payload: &[u8]) -> Result<PeeledLayer> {
    if payload.len() < MIN_LAYER_LEN {
        return Err(OnionError::Protocol(format!(
            "layer is {} bytes, minimum is {MIN_LAYER_LEN}",
            payload.len()
        )));
    }

    let (encrypted_key, body) = payload.split_at(ENCRYPTED_KEY_LEN);

    let mut key_bytes = ecies::decrypt_bytes(private_key, encrypted_key)?;
    let hop_key = SymmetricKey::from_slice(&key_bytes);
    key_bytes.zeroize();

    let plain = symmetric::open(&hop_key?, body)?;
    let (next_hop, inner) = Address::split_prefix(&plain)?;

    Ok(PeeledLayer {
        next_hop,
        inner: inner.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use skein_crypto::{CryptoError, KeyPair};

    use super::*;

    fn addr(v: u64) -> Address {
        Address::new(v).expect("address")
    }

    #[test]
    fn test_seal_then_peel() {
        let relay = KeyPair::generate();
        let key = SymmetricKey::generate();

        let layer = seal_layer(&key, relay.public(), addr(3005), b"hello").expect("seal");
        let peeled = peel_layer(relay.private(), &layer).expect("peel");

        assert_eq!(peeled.next_hop, addr(3005));
        assert_eq!(peeled.inner, b"hello");
    }

    #[test]
    fn test_layer_length() {
        let relay = KeyPair::generate();
        let layer = seal_layer(&SymmetricKey::generate(), relay.public(), addr(1), b"abc")
            .expect("seal");
        assert_eq!(layer.len(), MIN_LAYER_LEN + 3);
    }

    #[test]
    fn test_inner_payload_starting_with_digits() {
        let relay = KeyPair::generate();
        let layer = seal_layer(
            &SymmetricKey::generate(),
            relay.public(),
            addr(4012),
            b"0000000042 is not an address",
        )
        .expect("seal");

        let peeled = peel_layer(relay.private(), &layer).expect("peel");
        assert_eq!(peeled.next_hop, addr(4012));
        assert_eq!(peeled.inner, b"0000000042 is not an address");
    }

    #[test]
    fn test_wrong_private_key_is_crypto_error() {
        let intended = KeyPair::generate();
        let other = KeyPair::generate();
        let layer = seal_layer(&SymmetricKey::generate(), intended.public(), addr(1), b"m")
            .expect("seal");

        let result = peel_layer(other.private(), &layer);
        assert!(matches!(
            result,
            Err(OnionError::Crypto(CryptoError::AeadDecryption))
        ));
    }

    #[test]
    fn test_short_payload_is_protocol_error() {
        let relay = KeyPair::generate();
        let result = peel_layer(relay.private(), &[0u8; MIN_LAYER_LEN - 1]);
        assert!(matches!(result, Err(OnionError::Protocol(_))));
    }

    #[test]
    fn test_tampered_body_is_crypto_error() {
        let relay = KeyPair::generate();
        let mut layer = seal_layer(&SymmetricKey::generate(), relay.public(), addr(1), b"m")
            .expect("seal");
        let last = layer.len() - 1;
        layer[last] ^= 0x80;

        assert!(matches!(
            peel_layer(relay.private(), &layer),
            Err(OnionError::Crypto(_))
        ));
    }

    #[test]
    fn test_corrupt_address_field_is_protocol_error() {
        let relay = KeyPair::generate();
        for position in 0..ADDRESS_WIDTH {
            let mut header = addr(4007).encode();
            header[position] = b'x';
            let layer =
                seal_with_header(&SymmetricKey::generate(), relay.public(), &header, b"inner")
                    .expect("seal");

            let result = peel_layer(relay.private(), &layer);
            assert!(
                matches!(result, Err(OnionError::Protocol(_))),
                "corrupt byte {position} not rejected"
            );
        }
    }
}
