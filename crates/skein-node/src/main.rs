//! skein-node: launches a local Skein relay network.
//!
//! Configuration is read from `$SKEIN_CONFIG` or `./skein.toml`.

use tracing::{error, info};

use skein_node::{launch, NodeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = NodeConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("skein={}", config.logging.log_level).parse()?),
        )
        .init();

    info!("Skein node starting");

    // 3. Start registry, relays and users
    let mut network = launch(&config).await?;

    // 4. Run until an endpoint stops or Ctrl-C
    tokio::select! {
        exited = network.wait() => {
            match exited {
                Some((name, Err(e))) => error!("{} stopped: {}", name, e),
                Some((name, Ok(()))) => info!("{} stopped", name),
                None => info!("No endpoints running"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    network.shutdown().await;
    info!("Node stopped");
    Ok(())
}
