//! Request servers for registry, relay and user endpoints.
//!
//! [`serve`] accepts TCP connections and answers each request frame with
//! the [`Service`] it was given. Every connection runs on its own task and
//! every request is handled independently; a failing request produces a
//! [`Response::Error`] and never tears down the listener.

use std::future::Future;
use std::sync::Arc;

use skein_directory::DirectoryStore;
use skein_onion::{Relay, RelayDirectory, Transport, UserNode};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::cbor;
use crate::wire::{self, ErrorKind, Probe, Request, Response, MAX_MESSAGE_LEN};
use crate::Result;

/// Something that answers requests.
pub trait Service: Send + Sync + 'static {
    /// Label used in logs.
    fn name(&self) -> String;

    /// Answer one request.
    fn handle(&self, request: Request) -> impl Future<Output = Response> + Send;
}

/// Accept connections on `listener` forever, serving each with `service`.
pub async fn serve<S: Service>(listener: TcpListener, service: Arc<S>) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!(service = %service.name(), %local_addr, "Listening");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let service = service.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(service, stream).await {
                        warn!(%peer, "Connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Accept error: {}", e);
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<S: Service>(service: Arc<S>, stream: TcpStream) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();

    while let Some(frame) = wire::read_frame_bytes(&mut reader).await? {
        let response = match cbor::from_slice::<Request>(&frame) {
            Ok(request) => {
                debug!(
                    service = %service.name(),
                    request = wire::request_name(&request),
                    "Dispatching request"
                );
                service.handle(request).await
            }
            Err(e) => Response::error(ErrorKind::Validation, format!("malformed request: {e}")),
        };
        wire::write_frame(&mut writer, &response).await?;
    }

    Ok(())
}

/// Serves the relay directory.
pub struct RegistryService<D> {
    directory: Arc<D>,
}

impl<D: DirectoryStore + 'static> RegistryService<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }
}

impl<D: DirectoryStore + 'static> Service for RegistryService<D> {
    fn name(&self) -> String {
        "registry".to_string()
    }

    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Status => Response::Live,
            Request::Register(record) => {
                let id = record.id;
                match self.directory.register(record) {
                    Ok(()) => {
                        info!(relay = %id, "Relay registered");
                        Response::Ack
                    }
                    Err(e) => Response::from(skein_onion::OnionError::from(e)),
                }
            }
            Request::ListRelays => Response::Relays(self.directory.list()),
            other => Response::unsupported(&other),
        }
    }
}

/// Serves one relay: onion layers in, introspection out.
pub struct RelayService<T> {
    relay: Relay<T>,
}

impl<T: Transport + 'static> RelayService<T> {
    pub fn new(relay: Relay<T>) -> Self {
        Self { relay }
    }
}

impl<T: Transport + 'static> Service for RelayService<T> {
    fn name(&self) -> String {
        format!("relay-{}", self.relay.id())
    }

    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Status => Response::Live,
            Request::Forward { payload } => match self.relay.handle_incoming(payload).await {
                Ok(_) => Response::Ack,
                Err(e) => Response::from(e),
            },
            Request::Inspect(Probe::LastEncrypted) => {
                Response::Bytes(self.relay.last_received_encrypted())
            }
            Request::Inspect(Probe::LastDecrypted) => {
                Response::Bytes(self.relay.last_received_decrypted())
            }
            Request::Inspect(Probe::LastDestination) => {
                Response::Address(self.relay.last_destination())
            }
            Request::Inspect(Probe::PrivateKey) => {
                Response::Text(Some(self.relay.export_private_key()))
            }
            other => Response::unsupported(&other),
        }
    }
}

/// Serves one user: deliveries in, send requests and introspection.
pub struct UserService<D, T> {
    user: UserNode<D, T>,
}

impl<D: RelayDirectory + 'static, T: Transport + 'static> UserService<D, T> {
    /// Serve `user`, capping its outgoing messages to what a frame carries.
    pub fn new(user: UserNode<D, T>) -> Self {
        let limit = user.max_message_len().min(MAX_MESSAGE_LEN);
        Self {
            user: user.with_max_message_len(limit),
        }
    }
}

impl<D: RelayDirectory + 'static, T: Transport + 'static> Service for UserService<D, T> {
    fn name(&self) -> String {
        format!("user-{}", self.user.id())
    }

    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Status => Response::Live,
            Request::Forward { payload } => match self.user.deliver(&payload) {
                Ok(()) => Response::Ack,
                Err(e) => Response::from(e),
            },
            Request::SendMessage {
                message,
                destination,
            } => match self.user.build_and_send(&message, destination).await {
                Ok(path) => Response::Path(path),
                Err(e) => {
                    warn!(user = %self.user.id(), error = %e, "Send failed");
                    Response::from(e)
                }
            },
            Request::Inspect(Probe::LastSent) => Response::Text(self.user.last_sent_message()),
            Request::Inspect(Probe::LastReceived) => {
                Response::Text(self.user.last_received_message())
            }
            other => Response::unsupported(&other),
        }
    }
}
