use async_trait::async_trait;

use crate::record::CacheRecord;

/// Keyed record storage used by the validation engine.
///
/// Every call stands alone; nothing spans two calls. Implementations
/// never fail: an unavailable backend reads as "absent" and writes
/// become no-ops.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheRecord>;

    /// Upsert: replaces any record already stored under `key`.
    async fn put(&self, key: &str, record: CacheRecord);

    /// No-op when `key` is absent.
    async fn delete(&self, key: &str);

    async fn exists(&self, key: &str) -> bool;

    /// Short backend name for logs and the admin snapshot.
    fn backend(&self) -> &'static str;
}

/// Store that holds nothing. Used when caching is disabled or the
/// persistent backend could not be opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl CacheStore for NullStore {
    async fn get(&self, _key: &str) -> Option<CacheRecord> {
        None
    }

    async fn put(&self, _key: &str, _record: CacheRecord) {}

    async fn delete(&self, _key: &str) {}

    async fn exists(&self, _key: &str) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
