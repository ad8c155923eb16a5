//! # skein-node
//!
//! Runs a Skein network: one registry, a set of relays and a set of users,
//! each listening on its own TCP port.
//!
//! - [`config`] - TOML configuration with defaults
//! - [`launch`] - Starts every endpoint and tracks their tasks

pub mod config;
pub mod launch;

pub use config::NodeConfig;
pub use launch::{launch, Network};
