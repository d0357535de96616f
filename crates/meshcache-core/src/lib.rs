//! # MeshCache Core
//!
//! Engine of the MeshCache distributed read-through key-value cache.
//!
//! A MeshCache deployment is a peer group of identical nodes. A client may
//! address any node; the node serves the value from its local byte-bounded
//! LRU cache, forwards the request to the peer that owns the key (chosen by
//! consistent hashing over the peer set), or, as the authority of last
//! resort, invokes a caller-supplied [`Loader`] and caches the result.
//! Concurrent misses for the same key are collapsed into a single loader
//! invocation.
//!
//! This crate is deliberately transport-free: the HTTP plumbing between
//! nodes lives in `meshcache-server` and plugs in through the
//! [`PeerPicker`]/[`PeerGetter`] traits.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meshcache_core::{Registry, Result};
//!
//! let registry = Registry::new();
//! let group = registry.add_group("info", 2 << 10, |key: &str| -> Result<Vec<u8>> {
//!     database_lookup(key)
//! });
//!
//! let value = group.get("Name")?;
//! println!("{value}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod chunk;
pub mod error;
pub mod group;
pub mod lru;
pub mod peer;
pub mod ring;
pub mod singleflight;

pub use cache::{CacheStats, SafeCache};
pub use chunk::Chunk;
pub use error::{Error, Result};
pub use group::{Group, Loader, Registry};
pub use lru::{LruStore, Weighted};
pub use peer::{PeerGetter, PeerPicker};
pub use ring::HashRing;
pub use singleflight::SingleFlight;
