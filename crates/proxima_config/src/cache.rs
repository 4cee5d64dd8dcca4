use serde::Deserialize;

/// Where cache records live.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Sqlite,
    Memory,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Sqlite => "sqlite",
            CacheBackend::Memory => "memory",
        }
    }
}

// =======================================================
// CACHE CONFIG + DEFAULTS
// =======================================================
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub db_path: String,
    pub table: String,

    /// Run lookup → probe → store/delete for one URL under a per-URL lock.
    pub serialize_per_key: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Sqlite,
            db_path: "proxima-cache.db".into(),
            table: "cache".into(),
            serialize_per_key: true,
        }
    }
}

impl CacheConfig {
    pub(crate) fn apply_defaults_from(&mut self, defaults: &CacheConfig) {
        if self.db_path.trim().is_empty() {
            self.db_path = defaults.db_path.clone();
        }
        if self.table.trim().is_empty() {
            self.table = defaults.table.clone();
        }
    }
}

/// SQL identifiers accepted for the cache table: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
