//! Integration test crate for the Skein relay network.
//!
//! This crate has no library code. It only contains integration tests
//! that exercise end-to-end flows across the workspace crates:
//!
//! - `onion_roundtrip`: relays and users wired through an in-process mailbox
//! - `tcp_network`: a launched network on loopback ports
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p skein-integration-tests
//! ```
