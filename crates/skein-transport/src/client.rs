//! Clients for the Skein wire protocol.
//!
//! Each call opens a fresh TCP connection, sends one [`Request`] and waits
//! for its [`Response`]. Connections are not pooled.

use std::net::{IpAddr, SocketAddr};

use skein_directory::DirectoryError;
use skein_onion::{OnionError, RelayDirectory, Transport};
use skein_types::{Address, NodeId, RelayRecord};
use tokio::net::TcpStream;
use tracing::debug;

use crate::cbor;
use crate::wire::{self, ErrorKind, Probe, Request, Response};
use crate::{Result, TransportError};

/// Send `request` to `addr` and wait for the answer.
///
/// A [`Response::Error`] is returned as [`TransportError::Remote`].
pub async fn call(addr: SocketAddr, request: &Request) -> Result<Response> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| TransportError::Connection(format!("{addr}: {e}")))?;
    let (mut reader, mut writer) = stream.into_split();

    debug!(%addr, request = wire::request_name(request), "Sending request");
    wire::write_frame(&mut writer, request).await?;

    let frame = wire::read_frame_bytes(&mut reader)
        .await?
        .ok_or_else(|| TransportError::Connection(format!("{addr} closed before responding")))?;

    match cbor::from_slice::<Response>(&frame)? {
        Response::Error { kind, detail } => Err(TransportError::Remote { kind, detail }),
        response => Ok(response),
    }
}

fn unexpected(response: &Response) -> TransportError {
    TransportError::ProtocolViolation(format!("unexpected response: {response:?}"))
}

/// Forwards onion payloads to `host:<address port>`.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    host: IpAddr,
}

impl TcpTransport {
    pub fn new(host: IpAddr) -> Self {
        Self { host }
    }

    /// Socket address an [`Address`] resolves to.
    pub fn socket_addr(&self, address: Address) -> std::result::Result<SocketAddr, OnionError> {
        let port = address.port()?;
        Ok(SocketAddr::new(self.host, port))
    }
}

impl Transport for TcpTransport {
    async fn forward(&self, to: Address, payload: Vec<u8>) -> skein_onion::Result<()> {
        let addr = self
            .socket_addr(to)
            .map_err(|e| OnionError::Network(format!("{to} has no port: {e}")))?;

        match call(addr, &Request::Forward { payload }).await {
            Ok(Response::Ack) => Ok(()),
            Ok(other) => Err(OnionError::Network(unexpected(&other).to_string())),
            Err(e) => Err(OnionError::Network(format!("forward to {to} failed: {e}"))),
        }
    }
}

/// Client for the relay registry.
#[derive(Clone, Debug)]
pub struct RegistryClient {
    addr: SocketAddr,
}

impl RegistryClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Register a relay.
    pub async fn register(&self, record: RelayRecord) -> skein_onion::Result<()> {
        let id = record.id;
        match call(self.addr, &Request::Register(record)).await {
            Ok(Response::Ack) => Ok(()),
            Ok(other) => Err(OnionError::Network(unexpected(&other).to_string())),
            Err(TransportError::Remote {
                kind: ErrorKind::Duplicate,
                ..
            }) => Err(DirectoryError::Duplicate(id).into()),
            Err(TransportError::Remote {
                kind: ErrorKind::Validation,
                detail,
            }) => Err(DirectoryError::Validation(detail).into()),
            Err(e) => Err(OnionError::Network(e.to_string())),
        }
    }

    pub async fn status(&self) -> Result<()> {
        expect_live(call(self.addr, &Request::Status).await?)
    }
}

impl RelayDirectory for RegistryClient {
    async fn relays(&self) -> skein_onion::Result<Vec<RelayRecord>> {
        match call(self.addr, &Request::ListRelays).await {
            Ok(Response::Relays(relays)) => Ok(relays),
            Ok(other) => Err(OnionError::Network(unexpected(&other).to_string())),
            Err(e) => Err(OnionError::Network(format!("directory unavailable: {e}"))),
        }
    }
}

fn expect_live(response: Response) -> Result<()> {
    match response {
        Response::Live => Ok(()),
        other => Err(unexpected(&other)),
    }
}

/// Client for a relay or user endpoint.
#[derive(Clone, Debug)]
pub struct NodeClient {
    addr: SocketAddr,
}

impl NodeClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub async fn status(&self) -> Result<()> {
        expect_live(call(self.addr, &Request::Status).await?)
    }

    /// Read an introspection value.
    pub async fn inspect(&self, probe: Probe) -> Result<Response> {
        call(self.addr, &Request::Inspect(probe)).await
    }

    /// Hand a raw payload to the endpoint.
    pub async fn forward(&self, payload: Vec<u8>) -> Result<()> {
        match call(self.addr, &Request::Forward { payload }).await? {
            Response::Ack => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Ask a user endpoint to send `message` to user `destination`.
    ///
    /// Returns the relay ids of the circuit used, entry first.
    pub async fn send_message(&self, message: &str, destination: NodeId) -> Result<Vec<NodeId>> {
        let request = Request::SendMessage {
            message: message.to_string(),
            destination,
        };
        match call(self.addr, &request).await? {
            Response::Path(path) => Ok(path),
            other => Err(unexpected(&other)),
        }
    }
}
