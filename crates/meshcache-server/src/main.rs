//! MeshCache node binary: peer endpoint, optional admin API.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meshcache_core::{Error, Registry, Result};
use meshcache_server::{admin_router, peer_router, AppState, HttpPool};

/// MeshCache node - one peer of a distributed read-through cache
#[derive(Parser, Debug)]
#[command(name = "meshcache-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL this node advertises to its peers
    #[arg(long, default_value = "http://127.0.0.1:8001", env = "MESHCACHE_ADDR")]
    addr: String,

    /// Base URLs of every node in the peer group, comma-separated
    /// (defaults to this node alone)
    #[arg(long, env = "MESHCACHE_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Listen address for the admin API, e.g. 127.0.0.1:9999
    #[arg(long, env = "MESHCACHE_API_ADDR")]
    api_addr: Option<String>,

    /// Path to a JSON object of string records served by the demo loader
    #[arg(long, env = "MESHCACHE_SOURCE")]
    source: Option<PathBuf>,

    /// Local cache capacity in bytes for the demo group (0 = unbounded)
    #[arg(long, default_value_t = 2048, env = "MESHCACHE_CACHE_BYTES")]
    cache_bytes: usize,
}

/// Records served when no `--source` file is given.
fn builtin_records() -> HashMap<String, String> {
    HashMap::from([
        ("Name".to_string(), "Iggie Wang".to_string()),
        ("Age".to_string(), "21".to_string()),
        ("Hobby".to_string(), "League of Legends".to_string()),
    ])
}

fn listen_addr(base: &str) -> anyhow::Result<&str> {
    base.strip_prefix("http://")
        .with_context(|| format!("address '{base}' must start with http://"))
}

/// Reads the demo loader's records from `source`, or falls back to the
/// built-in document.
fn load_records(source: Option<&std::path::Path>) -> anyhow::Result<HashMap<String, String>> {
    let Some(path) = source else {
        return Ok(builtin_records());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading source file {}", path.display()))?;
    serde_json::from_str(&raw).context("source file must be a JSON object of strings")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let records = load_records(args.source.as_deref())?;

    let registry = Arc::new(Registry::new());
    let group = registry.add_group(
        "info",
        args.cache_bytes,
        move |key: &str| -> Result<Vec<u8>> {
            tracing::info!(key, "loading from source");
            records
                .get(key)
                .map(|value| value.clone().into_bytes())
                .ok_or_else(|| Error::Loader(format!("{key} not exists")))
        },
    );

    let peers = if args.peers.is_empty() {
        vec![args.addr.clone()]
    } else {
        args.peers.clone()
    };
    tracing::info!(self_base = %args.addr, ?peers, "joining peer group");

    let pool = Arc::new(HttpPool::new(args.addr.clone()));
    pool.set_peers(peers);
    group.register_peers(pool);

    let state = Arc::new(AppState {
        registry: Arc::clone(&registry),
        api_group: group,
    });

    if let Some(api_addr) = args.api_addr.clone() {
        let admin = admin_router(Arc::clone(&state))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        tracing::info!("admin API listening on http://{api_addr}");
        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, admin).await {
                tracing::error!(%error, "admin API server exited");
            }
        });
    }

    let app = peer_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(listen_addr(&args.addr)?).await?;
    tracing::info!("cache server listening on {}", args.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_listen_addr_strips_the_scheme() {
        assert_eq!(
            listen_addr("http://127.0.0.1:8001").unwrap(),
            "127.0.0.1:8001"
        );
        assert!(listen_addr("tcp://127.0.0.1:8001").is_err());
    }

    #[test]
    fn test_load_records_defaults_to_the_builtin_document() {
        let records = load_records(None).unwrap();
        assert_eq!(records["Name"], "Iggie Wang");
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_load_records_reads_a_json_source_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"city": "Hangzhou"}}"#).unwrap();

        let records = load_records(Some(file.path())).unwrap();
        assert_eq!(records["city"], "Hangzhou");
    }

    #[test]
    fn test_load_records_rejects_a_missing_file() {
        assert!(load_records(Some(std::path::Path::new("/absent/source.json"))).is_err());
    }
}
