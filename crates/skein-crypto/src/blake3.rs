//! Domain-separated BLAKE3 key derivation.
//!
//! Every derived value uses BLAKE3's `derive_key` mode with a registered
//! context string. Reusing a context for a different purpose is a protocol
//! violation.

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const ECIES_ENCRYPTION_KEY: &str = "Skein v1 ecies-encryption-key";
    pub const ECIES_NONCE: &str = "Skein v1 ecies-nonce";

    /// All registered context strings.
    pub const ALL_CONTEXTS: &[&str] = &[ECIES_ENCRYPTION_KEY, ECIES_NONCE];
}

/// Derive a 32-byte key from `material` under a registered `context`.
pub fn derive_key(context: &str, material: &[u8]) -> [u8; 32] {
    ::blake3::derive_key(context, material)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_distinct() {
        let a = derive_key(contexts::ECIES_ENCRYPTION_KEY, b"material");
        let b = derive_key(contexts::ECIES_NONCE, b"material");
        assert_ne!(a, b);
    }

    #[test]
    fn test_contexts_registered_once() {
        let mut seen = std::collections::HashSet::new();
        for ctx in contexts::ALL_CONTEXTS {
            assert!(seen.insert(*ctx), "duplicate context {ctx}");
        }
    }
}
