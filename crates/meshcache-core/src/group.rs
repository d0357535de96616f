//! Groups: named cache instances, and the registry that owns them.
//!
//! A [`Group`] binds a local [`SafeCache`], a caller-supplied [`Loader`],
//! an optional peer picker, and a single-flight coalescer into the public
//! `get` contract: local hit, else coalesced { remote owner, else local
//! load-and-populate }.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::cache::{CacheStats, SafeCache};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::peer::{PeerGetter, PeerPicker};
use crate::singleflight::SingleFlight;

/// Produces the authoritative bytes for a key.
///
/// Implementations may be slow or fail; the engine never retries. Within
/// one group, the loader is invoked at most once per in-flight miss per
/// key.
pub trait Loader: Send + Sync {
    /// Loads the value for `key` from the underlying data source.
    fn load(&self, key: &str) -> Result<Vec<u8>>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        self(key)
    }
}

/// A named cache instance.
///
/// Immutable after construction except for the peer picker, which
/// [`register_peers`](Group::register_peers) sets exactly once.
pub struct Group {
    name: String,
    cache: SafeCache,
    loader: Box<dyn Loader>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: SingleFlight<Chunk>,
}

impl Group {
    fn new(name: String, cache_bytes: usize, loader: Box<dyn Loader>) -> Self {
        Self {
            name,
            cache: SafeCache::new(cache_bytes),
            loader,
            peers: OnceLock::new(),
            flight: SingleFlight::new(),
        }
    }

    /// The group's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers the peer picker that routes misses to remote owners.
    ///
    /// # Panics
    ///
    /// Panics if called more than once for this group.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        assert!(
            self.peers.set(picker).is_ok(),
            "register_peers called more than once on group '{}'",
            self.name
        );
    }

    /// Returns the value for `key`.
    ///
    /// Checks the local cache first; on a miss, at most one thread per key
    /// loads the value (from the owning peer, or locally as a fallback)
    /// while concurrent callers wait for that result.
    ///
    /// # Errors
    ///
    /// [`Error::KeyRequired`] for an empty key, or the loader's error when
    /// the local load fails. Peer failures are logged and absorbed by the
    /// local fallback.
    pub fn get(&self, key: &str) -> Result<Chunk> {
        if key.is_empty() {
            return Err(Error::KeyRequired);
        }
        if let Some(chunk) = self.cache.get(key) {
            tracing::debug!(group = %self.name, key, "cache hit");
            return Ok(chunk);
        }
        tracing::debug!(group = %self.name, key, "cache miss");
        self.load(key)
    }

    /// Returns a snapshot of the local cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn load(&self, key: &str) -> Result<Chunk> {
        self.flight.run(key, || {
            if let Some(picker) = self.peers.get() {
                if let Some(peer) = picker.pick(key) {
                    match self.load_from_peer(peer.as_ref(), key) {
                        Ok(chunk) => return Ok(chunk),
                        Err(error) => {
                            tracing::warn!(
                                group = %self.name,
                                key,
                                %error,
                                "peer fetch failed, falling back to local load"
                            );
                        }
                    }
                }
            }
            self.load_locally(key)
        })
    }

    /// Fetches from the owning peer. The result is returned to the caller
    /// but not inserted into the local cache: the value's residency
    /// belongs to the peer.
    fn load_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<Chunk> {
        let bytes = peer.get(&self.name, key)?;
        Ok(Chunk::from(bytes))
    }

    fn load_locally(&self, key: &str) -> Result<Chunk> {
        let bytes = self.loader.load(key)?;
        let chunk = Chunk::from(bytes);
        self.cache.set(key, chunk.clone());
        Ok(chunk)
    }
}

/// Named lookup of groups.
///
/// An explicit value rather than process-global state: the RPC dispatcher
/// owns one and routes inbound requests through it. Insert-only; lookups
/// are read-mostly and stay concurrent while other groups are added.
#[derive(Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group and registers it under `name`.
    ///
    /// `cache_bytes` bounds the group's local cache (`0` = unbounded).
    /// Re-adding an existing name replaces the previous group.
    pub fn add_group<L>(&self, name: &str, cache_bytes: usize, loader: L) -> Arc<Group>
    where
        L: Loader + 'static,
    {
        let group = Arc::new(Group::new(
            name.to_string(),
            cache_bytes,
            Box::new(loader),
        ));
        self.groups
            .write()
            .insert(name.to_string(), Arc::clone(&group));
        group
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Names of all registered groups.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.groups.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn sample_records() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("Name", "Iggie Wang"),
            ("Age", "21"),
            ("Hobby", "League of Legends"),
        ])
    }

    /// A registry with one group over the sample records, counting loader
    /// invocations.
    fn sample_group(cache_bytes: usize) -> (Registry, Arc<Group>, Arc<AtomicUsize>) {
        let records = sample_records();
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let registry = Registry::new();
        let group = registry.add_group("info", cache_bytes, move |key: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            records
                .get(key)
                .map(|value| value.as_bytes().to_vec())
                .ok_or_else(|| Error::Loader(format!("{key} not exists")))
        });
        (registry, group, loads)
    }

    // ========== Lookup Scenarios ==========

    #[test]
    fn test_second_get_is_served_from_cache() {
        let (_registry, group, loads) = sample_group(2048);

        assert_eq!(group.get("Name").unwrap().to_string(), "Iggie Wang");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        assert_eq!(group.get("Name").unwrap().to_string(), "Iggie Wang");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_sample_record_loads_once() {
        let (_registry, group, loads) = sample_group(2048);

        for (key, value) in sample_records() {
            assert_eq!(group.get(key).unwrap().to_string(), value);
            assert_eq!(group.get(key).unwrap().to_string(), value);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_missing_key_surfaces_the_loader_error() {
        let (_registry, group, _loads) = sample_group(2048);

        let err = group.get("Unknown").unwrap_err();
        assert_eq!(err, Error::Loader("Unknown not exists".to_string()));
        assert_eq!(group.stats().entries, 0);
    }

    #[test]
    fn test_empty_key_is_rejected_before_the_loader() {
        let (_registry, group, loads) = sample_group(2048);

        assert_eq!(group.get("").unwrap_err(), Error::KeyRequired);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cache_eviction_drops_the_least_recent_key() {
        let records = HashMap::from([
            ("key1", "value1"),
            ("key2", "value2"),
            ("k3", "v3"),
        ]);
        let registry = Registry::new();
        let budget = "key1key2value1value2".len();
        let group = registry.add_group("evict", budget, move |key: &str| {
            records
                .get(key)
                .map(|value| value.as_bytes().to_vec())
                .ok_or_else(|| Error::Loader(format!("{key} not exists")))
        });

        group.get("key1").unwrap();
        group.get("key2").unwrap();
        group.get("k3").unwrap();

        let stats = group.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 1);

        // key1 was least recent; getting it again goes to the loader.
        group.get("key1").unwrap();
        assert_eq!(group.stats().evictions, 2);
    }

    // ========== Coalescing ==========

    #[test]
    fn test_concurrent_misses_invoke_the_loader_once() {
        let records = sample_records();
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let registry = Registry::new();
        let group = registry.add_group("slow", 2048, move |key: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            records
                .get(key)
                .map(|value| value.as_bytes().to_vec())
                .ok_or_else(|| Error::Loader(format!("{key} not exists")))
        });

        let mut handles = Vec::new();
        for _ in 0..100 {
            let group = Arc::clone(&group);
            handles.push(std::thread::spawn(move || group.get("Name")));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap().to_string(), "Iggie Wang");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    // ========== Peers ==========

    struct FailingPeer;

    impl PeerGetter for FailingPeer {
        fn get(&self, _group: &str, _key: &str) -> Result<Vec<u8>> {
            Err(Error::Peer("connection refused".to_string()))
        }
    }

    struct AlwaysRemote(Arc<dyn PeerGetter>);

    impl PeerPicker for AlwaysRemote {
        fn pick(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
            Some(Arc::clone(&self.0))
        }
    }

    struct CountingPeer {
        calls: AtomicUsize,
    }

    impl PeerGetter for CountingPeer {
        fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{group}/{key} from peer").into_bytes())
        }
    }

    #[test]
    fn test_peer_failure_falls_back_to_the_local_loader() {
        let (_registry, group, loads) = sample_group(2048);
        group.register_peers(Arc::new(AlwaysRemote(Arc::new(FailingPeer))));

        assert_eq!(group.get("Name").unwrap().to_string(), "Iggie Wang");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_peer_results_bypass_the_local_cache() {
        let (_registry, group, loads) = sample_group(2048);
        let peer = Arc::new(CountingPeer {
            calls: AtomicUsize::new(0),
        });
        group.register_peers(Arc::new(AlwaysRemote(Arc::clone(&peer) as _)));

        assert_eq!(
            group.get("Name").unwrap().to_string(),
            "info/Name from peer"
        );
        assert_eq!(group.get("Name").unwrap().to_string(), "info/Name from peer");

        // Both lookups went to the peer: nothing was cached locally and
        // the local loader never ran.
        assert_eq!(peer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(group.stats().entries, 0);
    }

    #[test]
    #[should_panic(expected = "register_peers called more than once")]
    fn test_registering_peers_twice_is_a_programmer_error() {
        let (_registry, group, _loads) = sample_group(2048);
        group.register_peers(Arc::new(AlwaysRemote(Arc::new(FailingPeer))));
        group.register_peers(Arc::new(AlwaysRemote(Arc::new(FailingPeer))));
    }

    // ========== Registry ==========

    #[test]
    fn test_registry_lookup_by_name() {
        let (registry, group, _loads) = sample_group(2048);

        assert!(Arc::ptr_eq(&registry.group("info").unwrap(), &group));
        assert!(registry.group("absent").is_none());
        assert_eq!(registry.group_names(), vec!["info".to_string()]);
    }

    #[test]
    fn test_registry_readd_replaces_the_group() {
        let (registry, group, _loads) = sample_group(2048);
        let replacement =
            registry.add_group("info", 2048, |_key: &str| -> Result<Vec<u8>> {
                Ok(b"static".to_vec())
            });

        assert!(!Arc::ptr_eq(&registry.group("info").unwrap(), &group));
        assert!(Arc::ptr_eq(&registry.group("info").unwrap(), &replacement));
    }
}
