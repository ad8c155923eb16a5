//! Wire protocol for the Skein network.
//!
//! Every exchange is one [`Request`] frame answered by one [`Response`]
//! frame over a TCP stream. A connection may carry several exchanges.
//!
//! ## Frame format
//!
//! ```text
//! [length: u32 big-endian][CBOR-encoded Request | Response]
//! ```

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use skein_onion::{circuit, OnionError};
use skein_types::{Address, NodeId, RelayRecord};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cbor;
use crate::{Result, TransportError};

/// Maximum encoded frame size (to prevent allocation attacks).
pub const MAX_FRAME_SIZE: usize = 1 << 20;

/// Room reserved in a frame for the CBOR envelope around a payload.
pub const ENVELOPE_OVERHEAD: usize = 64;

/// Largest onion a `Forward` frame can carry.
pub const MAX_ONION_LEN: usize = MAX_FRAME_SIZE - ENVELOPE_OVERHEAD;

/// Largest message, in bytes, whose wrapped onion still fits a frame.
pub const MAX_MESSAGE_LEN: usize = MAX_ONION_LEN - circuit::onion_len(0);

/// A request to a registry, relay or user endpoint.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Liveness probe.
    Status,
    /// An onion layer for a relay, or a final message for a user.
    Forward {
        #[serde_as(as = "serde_with::Bytes")]
        payload: Vec<u8>,
    },
    /// Ask a user endpoint to send `message` to user `destination`.
    SendMessage { message: String, destination: NodeId },
    /// Register a relay with the directory.
    Register(RelayRecord),
    /// List every registered relay.
    ListRelays,
    /// Read an introspection value.
    Inspect(Probe),
}

/// Introspection values. Debug only; not part of the onion protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Probe {
    /// Relay: last payload received, before decryption.
    LastEncrypted,
    /// Relay: inner payload of the last peeled layer.
    LastDecrypted,
    /// Relay: address the last peeled layer pointed to.
    LastDestination,
    /// Relay: private key text.
    PrivateKey,
    /// User: last message sent.
    LastSent,
    /// User: last message received.
    LastReceived,
}

/// Response to a [`Request`].
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Live,
    Ack,
    Relays(Vec<RelayRecord>),
    /// Circuit path chosen by a `SendMessage`.
    Path(Vec<NodeId>),
    Bytes(#[serde_as(as = "Option<serde_with::Bytes>")] Option<Vec<u8>>),
    Text(Option<String>),
    Address(Option<Address>),
    Error { kind: ErrorKind, detail: String },
}

/// Stable error classification carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    InsufficientRelays,
    Duplicate,
    Crypto,
    Protocol,
    Network,
    /// The endpoint does not serve this request.
    Unsupported,
}

impl Response {
    pub fn error(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Response::Error {
            kind,
            detail: detail.into(),
        }
    }

    pub fn unsupported(request: &Request) -> Self {
        Self::error(
            ErrorKind::Unsupported,
            format!("request not served here: {}", request_name(request)),
        )
    }
}

impl From<&OnionError> for ErrorKind {
    fn from(err: &OnionError) -> Self {
        use skein_directory::DirectoryError;

        match err {
            OnionError::Validation(_) => ErrorKind::Validation,
            OnionError::InsufficientRelays { .. } => ErrorKind::InsufficientRelays,
            OnionError::Directory(DirectoryError::Duplicate(_)) => ErrorKind::Duplicate,
            OnionError::Directory(DirectoryError::Validation(_)) => ErrorKind::Validation,
            OnionError::Crypto(_) => ErrorKind::Crypto,
            OnionError::Protocol(_) | OnionError::CircuitConstruction(_) => ErrorKind::Protocol,
            OnionError::Network(_) => ErrorKind::Network,
        }
    }
}

impl From<OnionError> for Response {
    fn from(err: OnionError) -> Self {
        Response::error(ErrorKind::from(&err), err.to_string())
    }
}

/// Short name of a request, for logs.
pub fn request_name(request: &Request) -> &'static str {
    match request {
        Request::Status => "status",
        Request::Forward { .. } => "forward",
        Request::SendMessage { .. } => "send_message",
        Request::Register(_) => "register",
        Request::ListRelays => "list_relays",
        Request::Inspect(_) => "inspect",
    }
}

/// Write one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = cbor::to_vec(value)?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(TransportError::ProtocolViolation(format!(
            "frame of {} bytes exceeds maximum {MAX_FRAME_SIZE}",
            body.len()
        )));
    }
    let len = u32::try_from(body.len())
        .map_err(|_| TransportError::ProtocolViolation("frame length overflow".into()))?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame's raw bytes. Returns `None` on a clean end of stream.
pub async fn read_frame_bytes<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TransportError::Connection(format!(
                "stream closed after {filled} of {} length bytes",
                len_buf.len()
            )));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::ProtocolViolation(format!(
            "frame of {len} bytes exceeds maximum {MAX_FRAME_SIZE}"
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}
