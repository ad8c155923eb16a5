//! User endpoint: sends onions and receives final deliveries.
//!
//! [`UserNode::build_and_send`] is the sending side of the protocol. Its
//! checks run in a fixed order, so that validation and availability errors
//! surface before any cryptographic work or network traffic:
//!
//! 1. empty or oversized message → [`OnionError::Validation`]
//! 2. directory fetch
//! 3. fewer than 3 distinct relays → [`OnionError::InsufficientRelays`]
//! 4. circuit build and wrapping
//! 5. forward to the entry relay

use skein_types::{Address, AddressPlan, NodeId};
use tracing::{debug, info};

use crate::circuit::{self, Circuit};
use crate::net::{RelayDirectory, Transport};
use crate::observe::Observed;
use crate::{OnionError, Result};

/// A user: message sender and final destination.
pub struct UserNode<D, T> {
    id: NodeId,
    plan: AddressPlan,
    directory: D,
    transport: T,
    max_message_len: usize,
    last_received: Observed<String>,
    last_sent: Observed<String>,
}

impl<D: RelayDirectory, T: Transport> UserNode<D, T> {
    pub fn new(id: NodeId, plan: AddressPlan, directory: D, transport: T) -> Self {
        Self {
            id,
            plan,
            directory,
            transport,
            max_message_len: usize::MAX,
            last_received: Observed::new(),
            last_sent: Observed::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Reject outgoing messages longer than `limit` bytes.
    pub fn with_max_message_len(mut self, limit: usize) -> Self {
        self.max_message_len = limit;
        self
    }

    /// Longest message [`UserNode::build_and_send`] accepts.
    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    /// This user's own address.
    pub fn address(&self) -> Address {
        self.plan.user(self.id)
    }

    /// Accept a final delivery from an exit relay.
    pub fn deliver(&self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Err(OnionError::Validation("missing message".into()));
        }
        let message = std::str::from_utf8(payload)
            .map_err(|e| OnionError::Validation(format!("message is not UTF-8: {e}")))?;

        info!(user = %self.id, len = message.len(), "Message received");
        self.last_received.set(message.to_string());
        Ok(())
    }

    /// Wrap `message` for user `destination` over a fresh random circuit and
    /// hand it to the entry relay.
    ///
    /// Returns the circuit path `[entry, middle, exit]`. Nothing is retried.
    pub async fn build_and_send(&self, message: &str, destination: NodeId) -> Result<Vec<NodeId>> {
        if message.is_empty() {
            return Err(OnionError::Validation("missing message".into()));
        }
        if message.len() > self.max_message_len {
            return Err(OnionError::Validation(format!(
                "message of {} bytes exceeds limit of {}",
                message.len(),
                self.max_message_len
            )));
        }

        let relays = self.directory.relays().await?;
        let circuit = self.prepare_circuit(&relays)?;

        let onion = circuit.wrap(message.as_bytes(), self.plan.user(destination))?;
        let entry = circuit.entry_hop().address;

        debug!(user = %self.id, %entry, size = onion.len(), "Sending onion to entry relay");
        self.transport.forward(entry, onion).await?;

        info!(user = %self.id, %destination, path = ?circuit.path(), "Message sent");
        self.last_sent.set(message.to_string());
        Ok(circuit.path())
    }

    fn prepare_circuit(&self, relays: &[skein_types::RelayRecord]) -> Result<Circuit> {
        circuit::build_circuit(relays, self.plan, &mut rand::thread_rng())
    }

    /// Most recent message delivered to this user.
    pub fn last_received_message(&self) -> Option<String> {
        self.last_received.get()
    }

    /// Most recent message this user sent successfully.
    pub fn last_sent_message(&self) -> Option<String> {
        self.last_sent.get()
    }
}
