//! Fx hash map and set aliases.
//!
//! The Fx hash is the hasher used inside `rustc`; it is faster than SipHash
//! for the short string and path keys used throughout the workspace and does
//! not need denial-of-service resistance because every key is local.
//!
//! ```
//! use tw_core::{FxHashMap, fx_hash_set};
//!
//! let mut map: FxHashMap<&str, u32> = FxHashMap::default();
//! map.insert("es5", 5);
//!
//! let set: tw_core::FxHashSet<String> = fx_hash_set();
//! assert!(set.is_empty());
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

/// Creates a new [`FxHashSet`] able to hold `capacity` elements without
/// reallocating.
#[inline]
#[must_use]
pub fn fx_hash_set_with_capacity<V>(capacity: usize) -> FxHashSet<V> {
    FxHashSet::with_capacity_and_hasher(capacity, rustc_hash::FxBuildHasher)
}
