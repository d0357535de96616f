//! Peer interface: how a group reaches the rest of the peer set.
//!
//! Both capabilities are supplied by the transport layer; the engine only
//! consumes them. `meshcache-server` implements them over HTTP with the
//! ring deciding ownership.

use std::sync::Arc;

use crate::error::Result;

/// Fetches the raw value for `(group, key)` from one remote peer.
pub trait PeerGetter: Send + Sync {
    /// Returns the value bytes, or [`Error::Peer`](crate::Error::Peer) on
    /// any transport or remote failure.
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>>;
}

/// Maps a key to the peer authoritative for it.
pub trait PeerPicker: Send + Sync {
    /// Returns a getter for the key's owner, or `None` when ownership
    /// resolves to the local node (or no peers are configured).
    ///
    /// A picker built on the hash ring must return `None` whenever the
    /// resolved identifier equals the local node's own.
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}
