mod cache;
mod http;
mod proxima;
mod server;
mod validation;

pub use cache::{CacheBackend, CacheConfig};
pub use http::HttpConfig;
pub use proxima::{LoadNotes, ProximaConfig};
pub use server::ServerConfig;
pub use validation::ConfigReport;
