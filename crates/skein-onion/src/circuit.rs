//! 3-hop circuit selection, construction and onion wrapping.
//!
//! A circuit lives for exactly one send. The sender samples three distinct
//! relays from a directory snapshot, imports their public keys, and wraps
//! the message from the exit hop outward:
//!
//! ```text
//! payload = message, next_hop = destination
//! for hop in [exit, middle, entry]:
//!     payload  = ECIES(hop.pk, k_hop) ++ seal(k_hop, next_hop ++ payload)
//!     next_hop = hop.address
//! ```
//!
//! The result is sent to the entry hop. Each `k_hop` is fresh per circuit
//! and dropped (zeroized) as soon as wrapping finishes.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use skein_crypto::{PublicKey, SymmetricKey};
use skein_types::{Address, AddressPlan, NodeId, RelayRecord};
use tracing::debug;

use crate::layer;
use crate::{OnionError, Result, CIRCUIT_HOPS};

/// Information about a single hop in the circuit.
#[derive(Clone, Debug)]
pub struct HopInfo {
    /// The relay's node ID.
    pub id: NodeId,
    /// The relay's imported public key.
    pub public_key: PublicKey,
    /// The relay's network address.
    pub address: Address,
}

/// A 3-hop circuit for one message.
#[derive(Debug)]
pub struct Circuit {
    /// The three hops in order (entry, middle, exit).
    hops: Vec<HopInfo>,
}

impl Circuit {
    /// Return the hops in this circuit.
    pub fn hops(&self) -> &[HopInfo] {
        &self.hops
    }

    /// Return the entry (first) hop.
    pub fn entry_hop(&self) -> &HopInfo {
        &self.hops[0]
    }

    /// Return the exit (third) hop.
    pub fn exit_hop(&self) -> &HopInfo {
        &self.hops[2]
    }

    /// Relay ids in path order.
    pub fn path(&self) -> Vec<NodeId> {
        self.hops.iter().map(|h| h.id).collect()
    }

    /// Wrap `message` for delivery to `destination`.
    ///
    /// Generates one fresh symmetric key per hop. The returned bytes go to
    /// [`Circuit::entry_hop`].
    pub fn wrap(&self, message: &[u8], destination: Address) -> Result<Vec<u8>> {
        let hop_keys: Vec<SymmetricKey> =
            self.hops.iter().map(|_| SymmetricKey::generate()).collect();

        let mut payload = message.to_vec();
        let mut next_hop = destination;

        for (hop, hop_key) in self.hops.iter().zip(&hop_keys).rev() {
            payload = layer::seal_layer(hop_key, &hop.public_key, next_hop, &payload)?;
            next_hop = hop.address;
        }

        debug!(
            path = ?self.path(),
            exit = %self.exit_hop().id,
            %destination,
            size = payload.len(),
            "Wrapped onion"
        );
        Ok(payload)
    }
}

/// Size of the onion [`Circuit::wrap`] produces for a `message_len`-byte
/// message.
pub const fn onion_len(message_len: usize) -> usize {
    message_len + CIRCUIT_HOPS * layer::MIN_LAYER_LEN
}

/// Builder for constructing 3-hop circuits from relay records.
pub struct CircuitBuilder {
    plan: AddressPlan,
    /// Selected relay records for the circuit hops.
    relays: Vec<RelayRecord>,
}

impl CircuitBuilder {
    /// Create a new circuit builder using `plan` to address relays.
    pub fn new(plan: AddressPlan) -> Self {
        Self {
            plan,
            relays: Vec::with_capacity(CIRCUIT_HOPS),
        }
    }

    /// Add a relay to the circuit path.
    ///
    /// Relays must be added in order: entry, middle, exit. A relay may appear
    /// only once.
    pub fn add_relay(mut self, relay: RelayRecord) -> Result<Self> {
        if self.relays.len() >= CIRCUIT_HOPS {
            return Err(OnionError::CircuitConstruction(format!(
                "circuit already has {} hops (maximum {})",
                self.relays.len(),
                CIRCUIT_HOPS,
            )));
        }
        if self.relays.iter().any(|r| r.id == relay.id) {
            return Err(OnionError::CircuitConstruction(format!(
                "relay {} appears twice in one circuit",
                relay.id
            )));
        }
        self.relays.push(relay);
        Ok(self)
    }

    /// Build the circuit, importing each relay's public key.
    pub fn build(self) -> Result<Circuit> {
        if self.relays.len() != CIRCUIT_HOPS {
            return Err(OnionError::InsufficientRelays {
                need: CIRCUIT_HOPS,
                have: self.relays.len(),
            });
        }

        let hops = self
            .relays
            .iter()
            .map(|relay| {
                Ok(HopInfo {
                    id: relay.id,
                    public_key: PublicKey::from_text(&relay.public_key)?,
                    address: self.plan.relay(relay.id),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Circuit { hops })
    }
}

/// Pick [`CIRCUIT_HOPS`] distinct relays, uniformly without replacement.
///
/// Records repeating an id already seen are ignored. Fails with
/// [`OnionError::InsufficientRelays`] when fewer than three distinct relays
/// are available. The returned order is `[entry, middle, exit]`.
pub fn select_path<R: Rng + ?Sized>(relays: &[RelayRecord], rng: &mut R) -> Result<Vec<RelayRecord>> {
    let mut seen = HashSet::with_capacity(relays.len());
    let distinct: Vec<&RelayRecord> = relays.iter().filter(|r| seen.insert(r.id)).collect();

    if distinct.len() < CIRCUIT_HOPS {
        return Err(OnionError::InsufficientRelays {
            need: CIRCUIT_HOPS,
            have: distinct.len(),
        });
    }

    let mut path: Vec<RelayRecord> = distinct
        .choose_multiple(rng, CIRCUIT_HOPS)
        .map(|r| (*r).clone())
        .collect();
    path.shuffle(rng);

    debug!("Selected {} relays for circuit", path.len());
    Ok(path)
}

/// Select a path from `relays` and build its circuit.
pub fn build_circuit<R: Rng + ?Sized>(
    relays: &[RelayRecord],
    plan: AddressPlan,
    rng: &mut R,
) -> Result<Circuit> {
    select_path(relays, rng)?
        .into_iter()
        .try_fold(CircuitBuilder::new(plan), CircuitBuilder::add_relay)?
        .build()
}
