//! Error types for MeshCache.
//!
//! One enum covers every failure the engine can surface. The enum is
//! `Clone` on purpose: a single-flight call publishes one outcome to every
//! waiter, so the error must be fan-out-able.

use thiserror::Error;

/// Result type alias for MeshCache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in MeshCache operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The caller passed an empty key. Rejected before the cache or loader
    /// is consulted, so a misbehaving client cannot churn the loader.
    #[error("key must not be empty")]
    KeyRequired,

    /// No group with the given name exists in the registry.
    #[error("no such group: '{0}'")]
    GroupNotFound(String),

    /// The user-supplied loader failed. The message is the loader's own,
    /// propagated verbatim.
    #[error("loader failed: {0}")]
    Loader(String),

    /// A remote peer fetch failed. Never escapes a successful
    /// [`Group::get`](crate::Group::get): the group logs it and falls back
    /// to the local loader.
    #[error("peer fetch failed: {0}")]
    Peer(String),
}
