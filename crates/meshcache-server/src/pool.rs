//! HTTP peer pool: consistent-hash ownership plus outbound fetches.
//!
//! One [`HttpPool`] per node. It keeps the hash ring over the peer base
//! URLs and one [`HttpGetter`] per peer, and plugs into the engine as its
//! [`PeerPicker`]: the ring resolves the owner, and resolving to the
//! node's own base URL means "serve it locally".

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use meshcache_core::{Error, HashRing, PeerGetter, PeerPicker, Result};

/// Path prefix every peer endpoint serves under.
pub const BASE_PATH: &str = "/meshcache/";

/// Virtual nodes contributed by each peer on the ring.
pub const DEFAULT_REPLICAS: usize = 50;

/// Routes keys to peers over HTTP.
pub struct HttpPool {
    /// Base URL this node advertises, e.g. `http://10.0.0.1:8001`.
    self_base: String,
    routes: Mutex<Routes>,
}

struct Routes {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpGetter>>,
}

impl HttpPool {
    /// Creates a pool for the node advertising `self_base`. The peer set
    /// is empty until [`set_peers`](HttpPool::set_peers).
    pub fn new(self_base: impl Into<String>) -> Self {
        Self {
            self_base: self_base.into(),
            routes: Mutex::new(Routes {
                ring: HashRing::new(DEFAULT_REPLICAS),
                getters: HashMap::new(),
            }),
        }
    }

    /// Replaces the peer set (base URLs, normally including this node's
    /// own), rebuilding the ring and the per-peer getters.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();
        let mut ring = HashRing::new(DEFAULT_REPLICAS);
        ring.add(peers.iter().cloned());
        let getters = peers
            .into_iter()
            .map(|peer| {
                let getter = Arc::new(HttpGetter::new(format!("{peer}{BASE_PATH}")));
                (peer, getter)
            })
            .collect();
        *self.routes.lock() = Routes { ring, getters };
    }
}

impl PeerPicker for HttpPool {
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let routes = self.routes.lock();
        let owner = routes.ring.pick(key)?;
        if owner == self.self_base {
            return None;
        }
        tracing::debug!(peer = owner, key, "picked remote peer");
        let getter = routes.getters.get(owner)?;
        Some(Arc::clone(getter) as Arc<dyn PeerGetter>)
    }
}

/// Fetches values from one remote peer over HTTP.
///
/// Request URLs follow `<peer><base-path><group>/<key>` with
/// percent-encoded path segments; the response body is the raw value
/// bytes, and any status other than 200 is a peer failure.
pub struct HttpGetter {
    base_url: String,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpGetter {
    fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: OnceLock::new(),
        }
    }

    fn url(&self, group: &str, key: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            utf8_percent_encode(group, NON_ALPHANUMERIC),
            utf8_percent_encode(key, NON_ALPHANUMERIC)
        )
    }

    /// Built on first use, which happens on a blocking thread: a blocking
    /// client must not be created or used on async runtime threads.
    fn client(&self) -> &reqwest::blocking::Client {
        self.client.get_or_init(reqwest::blocking::Client::new)
    }
}

impl PeerGetter for HttpGetter {
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.url(group, key);
        let response = self
            .client()
            .get(&url)
            .send()
            .map_err(|e| Error::Peer(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::Peer(format!(
                "peer returned {} for {url}",
                response.status()
            )));
        }
        let body = response.bytes().map_err(|e| Error::Peer(e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getter_url_shape() {
        let getter = HttpGetter::new(format!("http://127.0.0.1:8002{BASE_PATH}"));
        assert_eq!(
            getter.url("info", "Name"),
            "http://127.0.0.1:8002/meshcache/info/Name"
        );
    }

    #[test]
    fn test_getter_url_percent_encodes_segments() {
        let getter = HttpGetter::new(format!("http://peer{BASE_PATH}"));
        let url = getter.url("my group", "a/b?c");
        assert_eq!(url, "http://peer/meshcache/my%20group/a%2Fb%3Fc");
    }

    #[test]
    fn test_single_peer_pool_always_serves_locally() {
        let pool = HttpPool::new("http://127.0.0.1:8001");
        pool.set_peers(["http://127.0.0.1:8001"]);

        for i in 0..100 {
            assert!(pool.pick(&format!("key{i}")).is_none());
        }
    }

    #[test]
    fn test_empty_pool_serves_locally() {
        let pool = HttpPool::new("http://127.0.0.1:8001");
        assert!(pool.pick("any").is_none());
    }

    #[test]
    fn test_two_peer_pool_splits_ownership() {
        let (me, other) = ("http://127.0.0.1:8001", "http://127.0.0.1:8002");
        let pool = HttpPool::new(me);
        pool.set_peers([me, other]);

        let remote = (0..100)
            .filter(|i| pool.pick(&format!("key{i}")).is_some())
            .count();

        // CRC32 is fixed, so the split is deterministic; both nodes own a
        // share of these keys.
        assert!(remote > 0, "no key routed to the remote peer");
        assert!(remote < 100, "no key owned locally");
    }

    #[test]
    fn test_pool_agrees_with_a_plain_ring() {
        let (me, other) = ("http://127.0.0.1:8001", "http://127.0.0.1:8002");
        let pool = HttpPool::new(me);
        pool.set_peers([me, other]);

        let mut ring = HashRing::new(DEFAULT_REPLICAS);
        ring.add([me, other]);

        for i in 0..100 {
            let key = format!("key{i}");
            let remote = pool.pick(&key).is_some();
            assert_eq!(remote, ring.pick(&key) == Some(other));
        }
    }
}
