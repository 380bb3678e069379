//! This module provides a deterministic hasher and a `HashMap` variant that uses it.
//! The hashing data structures in the standard library are randomly seeded per process, which
//! would make iteration order (and anything derived from it) differ between runs.
//!
//! `HashMap<K, V>` here does not have a `new` method. Use `HashMap::default()` instead.
//!
//! The `hash_str` free function is used to derive per-stream seeds in `crate::random`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::FxHashMap as HashMap;

/// A convenience method to compute a stable hash of a `&str`. The value depends only on
/// the bytes of `data`, never on the platform or process.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_strings() {
        let a = hash_str("hello");
        let b = hash_str("hello");
        let c = hash_str("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn similar_names_differ() {
        assert_ne!(hash_str("MovementRng"), hash_str("MovementRng2"));
    }
}
