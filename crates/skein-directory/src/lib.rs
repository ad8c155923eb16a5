//! # skein-directory
//!
//! The set of registered relays.
//!
//! The directory is an owned, injectable store behind a small add/list
//! interface ([`DirectoryStore`]). Registration is append-only and
//! register-if-absent: a second registration for the same id is rejected,
//! never overwritten. [`InMemoryDirectory`] is the only store the network
//! needs; tests use it directly as a double.

use std::sync::{PoisonError, RwLock};

use skein_crypto::PublicKey;
use skein_types::{NodeId, RelayRecord};
use tracing::{debug, warn};

/// Error types for directory operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// A relay with this id is already registered.
    #[error("relay {0} already registered")]
    Duplicate(NodeId),

    /// The registration request is missing or malformed.
    #[error("invalid registration: {0}")]
    Validation(String),
}

/// Convenience result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Add-one / list-all store of relay records.
pub trait DirectoryStore: Send + Sync {
    /// Register a relay, rejecting duplicates and malformed keys.
    fn register(&self, record: RelayRecord) -> Result<()>;

    /// Snapshot of every registered relay, in registration order.
    fn list(&self) -> Vec<RelayRecord>;

    /// Number of registered relays.
    fn len(&self) -> usize {
        self.list().len()
    }

    /// Whether no relay has registered yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local directory backed by a `Vec` under a lock.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    relays: RwLock<Vec<RelayRecord>>,
}

impl InMemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectoryStore for InMemoryDirectory {
    fn register(&self, record: RelayRecord) -> Result<()> {
        validate(&record)?;

        // Check and insert under one write guard so concurrent registrations
        // of the same id cannot both succeed.
        let mut relays = self.relays.write().unwrap_or_else(PoisonError::into_inner);
        if relays.iter().any(|r| r.id == record.id) {
            warn!(id = %record.id, "Rejected duplicate relay registration");
            return Err(DirectoryError::Duplicate(record.id));
        }

        debug!(id = %record.id, total = relays.len() + 1, "Relay registered");
        relays.push(record);
        Ok(())
    }

    fn list(&self) -> Vec<RelayRecord> {
        self.relays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn len(&self) -> usize {
        self.relays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn validate(record: &RelayRecord) -> Result<()> {
    if record.public_key.trim().is_empty() {
        return Err(DirectoryError::Validation("missing public key".into()));
    }
    PublicKey::from_text(&record.public_key)
        .map_err(|e| DirectoryError::Validation(format!("public key: {e}")))?;
    Ok(())
}
