//! Unwrap-and-forward state held by each relay.
//!
//! A relay owns one key pair for its whole life. For every incoming payload
//! it removes exactly one layer and forwards the inner bytes, unchanged, to
//! the address found in that layer. It does not know whether it is the exit
//! hop: the exit's inner bytes are the plaintext and its address is the
//! destination's, and the endpoint there treats them as a delivery.
//!
//! Messages are handled independently; a relay holds no circuit state. The
//! last payload, last decrypted layer and last destination are kept for
//! introspection only.

use skein_crypto::KeyPair;
use skein_types::{Address, NodeId, RelayRecord};
use tracing::{debug, warn};

use crate::layer;
use crate::net::Transport;
use crate::observe::Observed;
use crate::Result;

/// A relay node.
pub struct Relay<T> {
    id: NodeId,
    keys: KeyPair,
    transport: T,
    last_received_encrypted: Observed<Vec<u8>>,
    last_received_decrypted: Observed<Vec<u8>>,
    last_destination: Observed<Address>,
}

impl<T: Transport> Relay<T> {
    /// Create a relay with a freshly generated key pair.
    pub fn new(id: NodeId, transport: T) -> Self {
        Self::with_keys(id, KeyPair::generate(), transport)
    }

    /// Create a relay with an existing key pair.
    pub fn with_keys(id: NodeId, keys: KeyPair, transport: T) -> Self {
        Self {
            id,
            keys,
            transport,
            last_received_encrypted: Observed::new(),
            last_received_decrypted: Observed::new(),
            last_destination: Observed::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The directory record advertising this relay.
    pub fn record(&self) -> RelayRecord {
        RelayRecord::new(self.id, self.keys.public().to_text())
    }

    /// Export the private key as text. Debug use only.
    pub fn export_private_key(&self) -> String {
        self.keys.private().to_text()
    }

    /// Remove one layer from `payload` and forward the remainder.
    ///
    /// Returns the address the remainder was forwarded to. On any error
    /// nothing is forwarded.
    pub async fn handle_incoming(&self, payload: Vec<u8>) -> Result<Address> {
        self.last_received_encrypted.set(payload.clone());

        let peeled = match layer::peel_layer(self.keys.private(), &payload) {
            Ok(peeled) => peeled,
            Err(e) => {
                warn!(relay = %self.id, size = payload.len(), error = %e, "Dropping undecodable layer");
                return Err(e);
            }
        };

        self.last_received_decrypted.set(peeled.inner.clone());
        self.last_destination.set(peeled.next_hop);

        debug!(
            relay = %self.id,
            next_hop = %peeled.next_hop,
            size = peeled.inner.len(),
            "Forwarding peeled layer"
        );

        let next_hop = peeled.next_hop;
        if let Err(e) = self.transport.forward(next_hop, peeled.inner).await {
            warn!(relay = %self.id, %next_hop, error = %e, "Forward failed");
            return Err(e);
        }
        Ok(next_hop)
    }

    /// Most recent payload received, before decryption.
    pub fn last_received_encrypted(&self) -> Option<Vec<u8>> {
        self.last_received_encrypted.get()
    }

    /// Inner payload of the most recently peeled layer.
    pub fn last_received_decrypted(&self) -> Option<Vec<u8>> {
        self.last_received_decrypted.get()
    }

    /// Address the most recently peeled layer pointed to.
    pub fn last_destination(&self) -> Option<Address> {
        self.last_destination.get()
    }
}
