//! CBOR encoding of frame bodies (RFC 8949), via [`ciborium`].
//!
//! A frame body holds exactly one value. Bytes left over after it are a
//! decoding error.

use serde::{de::DeserializeOwned, Serialize};

use crate::{Result, TransportError};

/// Encode `value` as one CBOR item.
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out)
        .map_err(|e| TransportError::Serialization(format!("CBOR encode: {e}")))?;
    Ok(out)
}

/// Decode exactly one CBOR item from `data`.
///
/// # Errors
///
/// [`TransportError::Deserialization`] if `data` is not a valid encoding of
/// `T` or has trailing bytes.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    let mut rest = data;
    let value = ciborium::from_reader(&mut rest)
        .map_err(|e| TransportError::Deserialization(format!("CBOR decode: {e}")))?;
    if !rest.is_empty() {
        return Err(TransportError::Deserialization(format!(
            "{} trailing bytes after CBOR item",
            rest.len()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Probe, Request};

    #[test]
    fn test_forward_request_survives_encoding() {
        let request = Request::Forward {
            payload: vec![1, 2, 3, 4],
        };
        let bytes = to_vec(&request).expect("encode");
        let restored: Request = from_slice(&bytes).expect("decode");
        assert_eq!(restored, request);
    }

    #[test]
    fn test_garbage_rejected() {
        let result: Result<Request> = from_slice(&[0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(TransportError::Deserialization(_))));
    }

    #[test]
    fn test_empty_rejected() {
        let result: Result<Request> = from_slice(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = to_vec(&Request::Inspect(Probe::LastSent)).expect("encode");
        bytes.push(0x00);
        let result: Result<Request> = from_slice(&bytes);
        assert!(matches!(result, Err(TransportError::Deserialization(_))));
    }
}
