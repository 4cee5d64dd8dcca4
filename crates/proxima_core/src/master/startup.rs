use std::sync::Arc;

use proxima_cache::{CacheMetrics, CacheStore, MemoryStore, NullStore, SqliteStore};
use proxima_config::{CacheBackend, CacheConfig, ProximaConfig};
use proxima_proxy::{CacheValidator, Dispatcher, KeyLocks, TcpOrigin};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::Master;

impl Master {
    pub(super) fn log_startup(&self) {
        info!(target: "proxima::master", "Starting PROXIMA");
        info!(
            target: "proxima::master",
            listen = %self.cfg.server.listen,
            worker_connections = self.cfg.server.worker_connections,
            cache = self.dispatcher.cache_backend(),
            "Proxy configuration loaded"
        );
    }

    pub(super) fn init_semaphore(&self) -> Arc<Semaphore> {
        let max_conns = self.cfg.server.worker_connections;
        let semaphore = Arc::new(Semaphore::new(max_conns));
        info!(
            target: "proxima::master",
            max_conns,
            "Global connection semaphore initialized"
        );
        semaphore
    }
}

/// Wires origin, store and validator from the configuration.
///
/// A store that cannot be opened does not stop startup: the proxy
/// keeps running with an always-empty store.
pub async fn build_dispatcher(cfg: &ProximaConfig) -> Dispatcher {
    let origin = Arc::new(TcpOrigin::from_config(&cfg.http));
    let metrics = Arc::new(CacheMetrics::new());

    if !cfg.cache.enabled {
        info!(target: "proxima::master", "Cache disabled; running as a pass-through proxy");
        return Dispatcher::new(origin, None, metrics);
    }

    let store = open_store(&cfg.cache).await;
    let mut validator = CacheValidator::new(store, origin.clone(), Arc::clone(&metrics));
    if cfg.cache.serialize_per_key {
        validator = validator.with_key_locks(KeyLocks::new());
    }

    Dispatcher::new(origin, Some(validator), metrics)
}

async fn open_store(cache: &CacheConfig) -> Arc<dyn CacheStore> {
    match cache.backend {
        CacheBackend::Memory => {
            info!(target: "proxima::store", "Using in-memory cache store");
            Arc::new(MemoryStore::new())
        }
        CacheBackend::Sqlite => match SqliteStore::open(&cache.db_path, &cache.table).await {
            Ok(store) => {
                info!(
                    target: "proxima::store",
                    db_path = %cache.db_path,
                    table = %cache.table,
                    "SQLite cache store opened"
                );
                Arc::new(store)
            }
            Err(e) => {
                error!(
                    target: "proxima::store",
                    db_path = %cache.db_path,
                    error = %e,
                    "Cannot open SQLite cache store"
                );
                warn!(target: "proxima::store", "Continuing without a cache store (pass-through)");
                Arc::new(NullStore)
            }
        },
    }
}
