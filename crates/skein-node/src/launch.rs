//! Launches a whole network in one process.
//!
//! The registry starts first. Each relay then binds its port, registers
//! itself and starts serving; users start last. Every endpoint is an
//! independent task on the shared runtime.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use skein_directory::InMemoryDirectory;
use skein_onion::{Relay, UserNode};
use skein_transport::{
    serve, RegistryClient, RegistryService, RelayService, TcpTransport, UserService,
};
use skein_types::NodeId;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::NodeConfig;

/// A running network.
///
/// Dropping it aborts every endpoint.
pub struct Network {
    registry: SocketAddr,
    relays: Vec<SocketAddr>,
    users: Vec<SocketAddr>,
    tasks: JoinSet<(String, skein_transport::Result<()>)>,
}

impl Network {
    pub fn registry_addr(&self) -> SocketAddr {
        self.registry
    }

    /// Listen address of relay `id`.
    pub fn relay_addr(&self, id: NodeId) -> Option<SocketAddr> {
        self.relays.get(id.0 as usize).copied()
    }

    /// Listen address of user `id`.
    pub fn user_addr(&self, id: NodeId) -> Option<SocketAddr> {
        self.users.get(id.0 as usize).copied()
    }

    /// Wait until an endpoint stops, returning its name and outcome.
    pub async fn wait(&mut self) -> Option<(String, anyhow::Result<()>)> {
        let joined = self.tasks.join_next().await?;
        Some(match joined {
            Ok((name, result)) => (name, result.map_err(anyhow::Error::from)),
            Err(e) => ("endpoint".to_string(), Err(anyhow::Error::from(e))),
        })
    }

    /// Abort every endpoint.
    pub async fn shutdown(mut self) {
        self.tasks.shutdown().await;
    }
}

/// Start the registry, relays and users described by `config`.
pub async fn launch(config: &NodeConfig) -> anyhow::Result<Network> {
    config.validate()?;

    let host = config.network.host;
    let plan = config.plan();
    let transport = Arc::new(TcpTransport::new(host));
    let mut tasks = JoinSet::new();

    let registry = SocketAddr::new(host, config.network.registry_port);
    let listener = bind(registry).await?;
    let directory = Arc::new(InMemoryDirectory::new());
    tasks.spawn(run("registry".to_string(), listener, RegistryService::new(directory)));
    let registry_client = Arc::new(RegistryClient::new(registry));

    let mut relays = Vec::with_capacity(usize::from(config.topology.relays));
    for n in 0..u32::from(config.topology.relays) {
        let id = NodeId(n);
        let addr = transport.socket_addr(plan.relay(id))?;
        let listener = bind(addr).await?;

        let relay = Relay::new(id, transport.clone());
        if let Err(e) = registry_client.register(relay.record()).await {
            warn!(relay = %id, "Registration failed: {}", e);
        }

        tasks.spawn(run(format!("relay-{id}"), listener, RelayService::new(relay)));
        relays.push(addr);
    }

    let mut users = Vec::with_capacity(usize::from(config.topology.users));
    for n in 0..u32::from(config.topology.users) {
        let id = NodeId(n);
        let addr = transport.socket_addr(plan.user(id))?;
        let listener = bind(addr).await?;

        let user = UserNode::new(id, plan, registry_client.clone(), transport.clone());
        tasks.spawn(run(format!("user-{id}"), listener, UserService::new(user)));
        users.push(addr);
    }

    info!(
        %registry,
        relays = relays.len(),
        users = users.len(),
        "Network launched"
    );

    Ok(Network {
        registry,
        relays,
        users,
        tasks,
    })
}

async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

async fn run<S: skein_transport::Service>(
    name: String,
    listener: TcpListener,
    service: S,
) -> (String, skein_transport::Result<()>) {
    let result = serve(listener, Arc::new(service)).await;
    (name, result)
}
