//! Consistent-hash ring with virtual-node replication.
//!
//! Each real node contributes `replicas` positions on a 32-bit ring, at
//! `hash(decimal(i) ++ id)` for `i` in `0..replicas`. Lookup is a circular
//! ceiling search: the smallest position at or above `hash(key)`, wrapping
//! to the first position. Two independently built rings over the same peer
//! set agree on ownership, which is what lets every node route a key to
//! the same authority.

use std::collections::HashMap;

/// Hash function mapping bytes to a 32-bit ring position.
pub type HashFn = fn(&[u8]) -> u32;

/// Consistent-hash mapping from key to real-node identifier.
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Virtual-node positions, sorted ascending.
    positions: Vec<u32>,
    /// Position to real-node identifier.
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Creates a ring using CRC32 (IEEE) as the hash function.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is zero.
    #[must_use]
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, crc32fast::hash)
    }

    /// Creates a ring with a custom hash function.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is zero.
    #[must_use]
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        assert!(replicas >= 1, "a ring needs at least one replica per node");
        Self {
            hash,
            replicas,
            positions: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Adds real nodes to the ring, each contributing `replicas` virtual
    /// positions.
    ///
    /// On a 32-bit position collision the later insert wins the
    /// position-to-owner slot; the earlier node loses one virtual
    /// position, a statistical loss and not a correctness issue.
    pub fn add<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            for i in 0..self.replicas {
                let position = (self.hash)(format!("{i}{id}").as_bytes());
                self.positions.push(position);
                self.owners.insert(position, id.clone());
            }
        }
        self.positions.sort_unstable();
    }

    /// Returns the identifier of the node owning `key`, or `None` if the
    /// ring is empty.
    #[must_use]
    pub fn pick(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.positions.partition_point(|&p| p < hash);
        let position = self.positions[idx % self.positions.len()];
        self.owners.get(&position).map(String::as_str)
    }

    /// Returns `true` if no nodes have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of virtual positions on the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }
}
