//! Seams between the onion protocol and the outside world.
//!
//! [`Transport`] delivers bytes to an [`Address`]; [`RelayDirectory`] yields
//! the current relay set. The protocol code is generic over both, so the
//! same `Relay` and `UserNode` run over TCP in the node and over a
//! [`Mailbox`] in tests.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use skein_directory::{DirectoryStore, InMemoryDirectory};
use skein_types::{Address, RelayRecord};

use crate::{OnionError, Result};

/// Sends a payload to the endpoint at an address.
///
/// Relays and destinations are addressed the same way; the endpoint decides
/// what the bytes mean.
pub trait Transport: Send + Sync {
    /// Deliver `payload` to `to`, failing with [`OnionError::Network`] if the
    /// endpoint is unreachable or refuses it.
    fn forward(&self, to: Address, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

/// Source of the registered relay set.
pub trait RelayDirectory: Send + Sync {
    /// Fetch every registered relay.
    fn relays(&self) -> impl Future<Output = Result<Vec<RelayRecord>>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn forward(&self, to: Address, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send {
        (**self).forward(to, payload)
    }
}

impl<D: RelayDirectory> RelayDirectory for Arc<D> {
    fn relays(&self) -> impl Future<Output = Result<Vec<RelayRecord>>> + Send {
        (**self).relays()
    }
}

impl RelayDirectory for InMemoryDirectory {
    async fn relays(&self) -> Result<Vec<RelayRecord>> {
        Ok(self.list())
    }
}

/// In-process transport that queues every forwarded payload.
///
/// Nothing is delivered on its own; callers pop messages with
/// [`Mailbox::take`] and hand them to the endpoint at the recorded address.
/// Addresses marked unreachable fail with [`OnionError::Network`].
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<(Address, Vec<u8>)>>,
    unreachable: Mutex<HashSet<Address>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later forward to `addr` fail.
    pub fn mark_unreachable(&self, addr: Address) {
        self.unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(addr);
    }

    /// Pop the oldest queued message.
    pub fn take(&self) -> Option<(Address, Vec<u8>)> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Remove and return every queued message, oldest first.
    pub fn drain(&self) -> Vec<(Address, Vec<u8>)> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for Mailbox {
    async fn forward(&self, to: Address, payload: Vec<u8>) -> Result<()> {
        let blocked = self
            .unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&to);
        if blocked {
            return Err(OnionError::Network(format!("{to} unreachable")));
        }
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((to, payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use skein_crypto::KeyPair;

    use super::*;

    #[tokio::test]
    async fn test_mailbox_queues_in_order() {
        let mailbox = Mailbox::new();
        let a = Address::new(4001).expect("addr");
        let b = Address::new(4002).expect("addr");

        mailbox.forward(a, b"one".to_vec()).await.expect("forward");
        mailbox.forward(b, b"two".to_vec()).await.expect("forward");

        assert_eq!(mailbox.len(), 2);
        assert_eq!(mailbox.take(), Some((a, b"one".to_vec())));
        assert_eq!(mailbox.drain(), vec![(b, b"two".to_vec())]);
        assert!(mailbox.is_empty());
    }

    #[tokio::test]
    async fn test_mailbox_unreachable() {
        let mailbox = Mailbox::new();
        let a = Address::new(4001).expect("addr");
        mailbox.mark_unreachable(a);

        let result = mailbox.forward(a, vec![1]).await;
        assert!(matches!(result, Err(OnionError::Network(_))));
        assert!(mailbox.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_directory_seam() {
        let dir = Arc::new(InMemoryDirectory::new());
        dir.register(RelayRecord::new(1, KeyPair::generate().public().to_text()))
            .expect("register");

        let relays = dir.relays().await.expect("relays");
        assert_eq!(relays.len(), 1);
    }
}
