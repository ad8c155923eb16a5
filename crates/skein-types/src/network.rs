//! Relay directory records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric identifier of a relay or user. Stable for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A registered relay: its identifier and base64 X25519 public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub id: NodeId,
    pub public_key: String,
}

impl RelayRecord {
    pub fn new(id: impl Into<NodeId>, public_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            public_key: public_key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let record = RelayRecord::new(7, "a2V5");
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["id"], 7);
        assert_eq!(json["public_key"], "a2V5");
    }
}
