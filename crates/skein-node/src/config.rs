//! Configuration file management.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use skein_types::{
    AddressPlan, DEFAULT_REGISTRY_PORT, DEFAULT_RELAY_BASE_PORT, DEFAULT_USER_BASE_PORT,
};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SKEIN_CONFIG";

/// Config file read when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "skein.toml";

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Addresses and ports.
    #[serde(default)]
    pub network: NetworkConfig,
    /// How many relays and users to launch.
    #[serde(default)]
    pub topology: TopologyConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Interface every endpoint binds and connects to.
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_registry_port")]
    pub registry_port: u16,
    /// Relay `n` listens on `relay_base_port + n`.
    #[serde(default = "default_relay_base_port")]
    pub relay_base_port: u16,
    /// User `n` listens on `user_base_port + n`.
    #[serde(default = "default_user_base_port")]
    pub user_base_port: u16,
}

/// Topology configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default = "default_relays")]
    pub relays: u16,
    #[serde(default = "default_users")]
    pub users: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_registry_port() -> u16 {
    DEFAULT_REGISTRY_PORT
}

fn default_relay_base_port() -> u16 {
    DEFAULT_RELAY_BASE_PORT
}

fn default_user_base_port() -> u16 {
    DEFAULT_USER_BASE_PORT
}

fn default_relays() -> u16 {
    10
}

fn default_users() -> u16 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            registry_port: default_registry_port(),
            relay_base_port: default_relay_base_port(),
            user_base_port: default_user_base_port(),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            relays: default_relays(),
            users: default_users(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from `$SKEIN_CONFIG`, or `./skein.toml`.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from `path`.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every port range fits and that no ranges overlap.
    pub fn validate(&self) -> anyhow::Result<()> {
        let net = &self.network;
        let relays = port_range("relay", net.relay_base_port, self.topology.relays)?;
        let users = port_range("user", net.user_base_port, self.topology.users)?;

        if relays.contains(&net.registry_port) || users.contains(&net.registry_port) {
            bail!("registry port {} overlaps a node port range", net.registry_port);
        }
        if relays.start < users.end && users.start < relays.end {
            bail!("relay ports {relays:?} overlap user ports {users:?}");
        }
        Ok(())
    }

    /// Address plan derived from the base ports.
    pub fn plan(&self) -> AddressPlan {
        AddressPlan::new(self.network.relay_base_port, self.network.user_base_port)
    }

    fn config_path() -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}

fn port_range(label: &str, base: u16, count: u16) -> anyhow::Result<std::ops::Range<u16>> {
    match base.checked_add(count) {
        Some(end) => Ok(base..end),
        None => bail!("{label} ports {base}+{count} exceed 65535"),
    }
}
