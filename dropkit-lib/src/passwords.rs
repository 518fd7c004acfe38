//! Per-use password derivation.
//!
//! Every use of an access key can be gated by its own password hash. The hash
//! is derived from a base secret, the key's canonical public key string and
//! the 1-based use index:
//!
//! ```text
//! h1 = SHA256(base_password ++ public_key ++ decimal(use_index))   (hex)
//! password_hash = SHA256(hexdecode(h1))                            (hex)
//! ```
//!
//! The second round hashes the raw bytes obtained by hex-decoding the first
//! round's hex digest, never the hex string itself. That asymmetry is a wire
//! protocol invariant; both issuer and verifier must reproduce it exactly.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Derive the password hash for one use of a key.
///
/// Pure and deterministic; `use_index` is 1-based (the first use is `1`).
pub fn derive(base_password: &str, public_key: &str, use_index: u32) -> String {
    let mut first = Sha256::new();
    first.update(base_password.as_bytes());
    first.update(public_key.as_bytes());
    first.update(use_index.to_string().as_bytes());
    // hexdecode(hexencode(d)) == d, so round two hashes the raw digest bytes.
    let h1 = first.finalize();
    hex::encode(Sha256::digest(h1))
}

/// Derive password hashes for the given uses of a key, keyed by use index.
pub fn passwords_for_key(
    base_password: &str,
    public_key: &str,
    uses: &[u32],
) -> BTreeMap<u32, String> {
    uses.iter()
        .map(|use_index| {
            (
                *use_index,
                derive(base_password, public_key, *use_index),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Pinned vectors for the two-round hex-then-bytes construction. The
    // first is the protocol's published reference vector; the second was
    // computed independently.
    #[test]
    fn matches_pinned_vectors() {
        assert_eq!(
            derive("nearcon2023-password", "ed25519:ABC", 1),
            "061947aa1b99a53a7f10d84b6cf1e9b50972b32ba7d337ea7ae71e6e7663159c"
        );
        assert_eq!(
            derive("gala-2026-base", "ed25519:ABC", 1),
            "d4bdf217ea475e4d19d16e8c85322b0fdad883cbd936e31b9a74808f3cd5647b"
        );
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = derive("base", "ed25519:aa", 3);
        let b = derive("base", "ed25519:aa", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn varies_with_every_input() {
        let reference = derive("base", "ed25519:aa", 1);
        assert_ne!(derive("other", "ed25519:aa", 1), reference);
        assert_ne!(derive("base", "ed25519:ab", 1), reference);
        assert_ne!(derive("base", "ed25519:aa", 2), reference);
    }

    #[test]
    fn maps_each_requested_use() {
        let map = passwords_for_key("base", "ed25519:aa", &[1, 2, 4]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&1), Some(&derive("base", "ed25519:aa", 1)));
        assert_eq!(map.get(&4), Some(&derive("base", "ed25519:aa", 4)));
        assert!(!map.contains_key(&3));
    }
}
