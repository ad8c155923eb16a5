//! Integration test: onion delivery through in-process relays.
//!
//! Relays and users share one [`Mailbox`]. The test pumps it: every queued
//! payload is handed to the relay or user owning its address, until the
//! queue is empty. No sockets are involved.

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use skein_crypto::{PrivateKey, SymmetricKey};
use skein_directory::{DirectoryStore, InMemoryDirectory};
use skein_onion::{circuit, layer, CircuitBuilder, Mailbox, OnionError, Relay, UserNode};
use skein_types::{Address, AddressPlan, NodeId};

type TestRelay = Relay<Arc<Mailbox>>;
type TestUser = UserNode<Arc<InMemoryDirectory>, Arc<Mailbox>>;

struct Harness {
    plan: AddressPlan,
    mailbox: Arc<Mailbox>,
    directory: Arc<InMemoryDirectory>,
    relays: Vec<TestRelay>,
    users: Vec<TestUser>,
}

impl Harness {
    fn new(relay_count: u32, user_count: u32) -> Self {
        let plan = AddressPlan::default();
        let mailbox = Arc::new(Mailbox::new());
        let directory = Arc::new(InMemoryDirectory::new());

        let relays: Vec<TestRelay> = (0..relay_count)
            .map(|n| Relay::new(NodeId(n), mailbox.clone()))
            .collect();
        for relay in &relays {
            directory.register(relay.record()).expect("register relay");
        }

        let users = (0..user_count)
            .map(|n| UserNode::new(NodeId(n), plan, directory.clone(), mailbox.clone()))
            .collect();

        Self {
            plan,
            mailbox,
            directory,
            relays,
            users,
        }
    }

    fn relay(&self, id: u32) -> &TestRelay {
        &self.relays[id as usize]
    }

    fn user(&self, id: u32) -> &TestUser {
        &self.users[id as usize]
    }

    /// Deliver queued payloads until the mailbox is empty.
    ///
    /// Returns the addresses visited, in order.
    async fn pump(&self) -> Vec<Address> {
        let mut visited = Vec::new();
        while let Some((to, payload)) = self.mailbox.take() {
            visited.push(to);
            if let Some(relay) = self.relays.iter().find(|r| self.plan.relay(r.id()) == to) {
                relay.handle_incoming(payload).await.expect("relay hop");
            } else if let Some(user) = self.users.iter().find(|u| u.address() == to) {
                user.deliver(&payload).expect("delivery");
            } else {
                panic!("no endpoint at {to}");
            }
        }
        visited
    }
}

#[tokio::test]
async fn build_and_send_reaches_destination() {
    let net = Harness::new(10, 6);

    let path = net
        .user(0)
        .build_and_send("hello", NodeId(5))
        .await
        .expect("send");
    let visited = net.pump().await;

    assert_eq!(path.len(), 3);
    let expected: Vec<Address> = path
        .iter()
        .map(|id| net.plan.relay(*id))
        .chain(std::iter::once(net.plan.user(NodeId(5))))
        .collect();
    assert_eq!(visited, expected);

    assert_eq!(net.user(5).last_received_message(), Some("hello".into()));
    assert_eq!(net.user(0).last_sent_message(), Some("hello".into()));
    assert_eq!(net.directory.len(), 10);
}

#[tokio::test]
async fn fixed_circuit_r7_r12_r3() {
    let net = Harness::new(15, 6);
    let records = net.directory.list();

    let circuit = [7usize, 12, 3]
        .into_iter()
        .try_fold(CircuitBuilder::new(net.plan), |b, i| {
            b.add_relay(records[i].clone())
        })
        .expect("add relays")
        .build()
        .expect("build");

    let onion = circuit
        .wrap(b"hello", net.plan.user(NodeId(5)))
        .expect("wrap");
    let r7 = net.relay(7);
    let r12 = net.relay(12);
    let r3 = net.relay(3);

    r7.handle_incoming(onion.clone()).await.expect("r7");
    assert_eq!(r7.last_destination(), Some(net.plan.relay(NodeId(12))));
    let (to, for_r12) = net.mailbox.take().expect("queued for r12");
    assert_eq!(to, net.plan.relay(NodeId(12)));

    r12.handle_incoming(for_r12).await.expect("r12");
    assert_eq!(r12.last_destination(), Some(net.plan.relay(NodeId(3))));
    let (_, for_r3) = net.mailbox.take().expect("queued for r3");

    r3.handle_incoming(for_r3).await.expect("r3");
    assert_eq!(r3.last_destination(), Some(net.plan.user(NodeId(5))));
    assert_eq!(r3.last_received_decrypted(), Some(b"hello".to_vec()));

    let (to, plain) = net.mailbox.take().expect("queued for user");
    assert_eq!(to, net.plan.user(NodeId(5)));
    net.user(5).deliver(&plain).expect("deliver");
    assert_eq!(net.user(5).last_received_message(), Some("hello".into()));

    assert_eq!(r7.last_received_encrypted(), Some(onion));
    for id in [0, 1, 2, 4, 5, 6, 8, 9, 10, 11, 13, 14] {
        assert!(net.relay(id).last_received_encrypted().is_none());
    }
}

#[tokio::test]
async fn too_few_relays_sends_nothing() {
    let net = Harness::new(2, 2);

    let result = net.user(0).build_and_send("hello", NodeId(1)).await;
    assert!(matches!(
        result,
        Err(OnionError::InsufficientRelays { need: 3, have: 2 })
    ));
    assert!(net.mailbox.is_empty());
    assert!(net.user(0).last_sent_message().is_none());
}

#[tokio::test]
async fn empty_message_rejected_before_directory() {
    let net = Harness::new(0, 1);

    let result = net.user(0).build_and_send("", NodeId(0)).await;
    assert!(matches!(result, Err(OnionError::Validation(_))));
    assert!(net.mailbox.is_empty());
}

#[tokio::test]
async fn layer_only_opens_for_its_relay() {
    let net = Harness::new(3, 1);
    let records = net.directory.list();
    let circuit = records
        .into_iter()
        .try_fold(CircuitBuilder::new(net.plan), CircuitBuilder::add_relay)
        .expect("add relays")
        .build()
        .expect("build");
    let onion = circuit.wrap(b"secret", net.plan.user(NodeId(0))).expect("wrap");

    let wrong = PrivateKey::from_text(&net.relay(1).export_private_key()).expect("key");
    assert!(matches!(
        layer::peel_layer(&wrong, &onion),
        Err(OnionError::Crypto(_))
    ));

    let right = PrivateKey::from_text(&net.relay(0).export_private_key()).expect("key");
    let peeled = layer::peel_layer(&right, &onion).expect("peel");
    assert_eq!(peeled.next_hop, net.plan.relay(NodeId(1)));

    // The middle layer is still sealed for relay 1.
    let middle = PrivateKey::from_text(&net.relay(1).export_private_key()).expect("key");
    assert!(layer::peel_layer(&middle, &peeled.inner).is_ok());
    assert!(layer::peel_layer(&right, &peeled.inner).is_err());
}

#[tokio::test]
async fn corrupted_address_is_protocol_error() {
    let net = Harness::new(1, 0);
    let relay = net.relay(0);
    let public_key =
        skein_crypto::PublicKey::from_text(&relay.record().public_key).expect("public key");

    // Seal a layer whose address field holds a non-digit.
    let mut header = *b"0000004001";
    header[4] = b'x';
    let mut plain = header.to_vec();
    plain.extend_from_slice(b"inner");
    let hop_key = SymmetricKey::generate();
    let body = skein_crypto::symmetric::seal(&hop_key, &plain).expect("seal body");
    let mut payload = skein_crypto::ecies::encrypt(&public_key, hop_key.as_bytes())
        .expect("wrap key")
        .to_bytes();
    payload.extend_from_slice(&body);

    let result = relay.handle_incoming(payload).await;
    assert!(matches!(result, Err(OnionError::Protocol(_))));
    assert!(net.mailbox.is_empty());
    assert!(relay.last_destination().is_none());
}

#[tokio::test]
async fn unreachable_entry_is_network_error() {
    let net = Harness::new(3, 1);
    for n in 0..3 {
        net.mailbox.mark_unreachable(net.plan.relay(NodeId(n)));
    }

    let result = net.user(0).build_and_send("hello", NodeId(0)).await;
    assert!(matches!(result, Err(OnionError::Network(_))));
    assert!(net.user(0).last_sent_message().is_none());
}

#[test]
fn seeded_selection_is_always_distinct() {
    let net = Harness::new(5, 0);
    let records = net.directory.list();

    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let path = circuit::select_path(&records, &mut rng).expect("select");
        let ids: HashSet<NodeId> = path.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3);
    }
}

#[tokio::test]
async fn introspection_reads_are_idempotent() {
    let net = Harness::new(3, 2);
    net.user(0)
        .build_and_send("hello", NodeId(1))
        .await
        .expect("send");
    net.pump().await;

    for relay in &net.relays {
        assert_eq!(relay.last_destination(), relay.last_destination());
        assert_eq!(relay.last_received_decrypted(), relay.last_received_decrypted());
    }
    assert_eq!(
        net.user(1).last_received_message(),
        net.user(1).last_received_message()
    );
}
