//! Fast hash map and hash set type aliases.
//!
//! The watch registry and the debounce table are keyed by paths and are hit on
//! every filesystem notification. These aliases use the Fx hash from
//! `rustc-hash`, which is cheaper than SipHash for short string keys. The keys
//! come from the local filesystem, so denial-of-service resistance is not a
//! concern.
//!
//! # Examples
//!
//! ```
//! use wr_core::{FxHashMap, FxHashSet};
//!
//! let mut pending: FxHashMap<String, u64> = FxHashMap::default();
//! pending.insert("src/main.rs".to_owned(), 1);
//!
//! let watched: FxHashSet<&str> = FxHashSet::default();
//! assert!(watched.is_empty());
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;
