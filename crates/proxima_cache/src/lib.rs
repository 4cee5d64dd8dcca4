pub mod error;
pub mod key;
pub mod memory;
pub mod metrics;
pub mod policy;
pub mod record;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use key::{CacheKey, url_authority};
pub use memory::MemoryStore;
pub use metrics::{CacheEvent, CacheMetrics, MetricsSnapshot};
pub use policy::CachePolicy;
pub use record::{CacheRecord, MAX_BODY_LEN, MAX_URL_LEN};
pub use sqlite::SqliteStore;
pub use store::{CacheStore, NullStore};
