//! # skein-transport
//!
//! TCP transport for the Skein relay network.
//!
//! - **Wire protocol**: length-prefixed CBOR [`Request`](wire::Request) /
//!   [`Response`](wire::Response) frames via [`wire`]
//! - **CBOR serialization** helpers via [`cbor`]
//! - **Clients**: [`TcpTransport`] (relay-to-relay forwarding),
//!   [`RegistryClient`] (directory access) and [`NodeClient`] via [`client`]
//! - **Servers**: registry, relay and user services via [`server`]
//!
//! ## Architecture
//!
//! ```text
//! UserNode / Relay (skein-onion)
//!     |  Transport::forward(address, bytes)
//!     v
//! TcpTransport       -- address -> 127.0.0.1:<port>
//!     |
//!     v
//! Request::Forward   -- [u32 BE length][CBOR]
//!     |
//!     v
//! RelayService / UserService on the next hop
//! ```

pub mod cbor;
pub mod client;
pub mod server;
pub mod wire;

pub use client::{NodeClient, RegistryClient, TcpTransport};
pub use server::{serve, RegistryService, RelayService, Service, UserService};
pub use wire::{ErrorKind, Probe, Request, Response};

/// Error types for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// CBOR serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// CBOR deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Protocol violation (oversized frame, unexpected response).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Could not connect, or the peer closed the connection early.
    #[error("connection error: {0}")]
    Connection(String),

    /// I/O error (socket, stream read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote endpoint answered with an error.
    #[error("remote error ({kind:?}): {detail}")]
    Remote { kind: ErrorKind, detail: String },
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
