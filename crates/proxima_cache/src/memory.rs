use async_trait::async_trait;
use dashmap::DashMap;

use crate::record::CacheRecord;
use crate::store::CacheStore;

/// Process-local store. Records are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: DashMap<String, CacheRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<CacheRecord> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    async fn put(&self, key: &str, record: CacheRecord) {
        self.inner.insert(key.to_string(), record);
    }

    async fn delete(&self, key: &str) {
        self.inner.remove(key);
    }

    async fn exists(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
