use std::time::Duration;

use serde::Deserialize;

// =======================================================
// HTTP CONFIG + DEFAULTS
// =======================================================
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    // Client side (seconds)
    pub client_read_timeout_secs: u64,

    // Origin side
    pub proxy_connect_timeout_secs: u64,
    pub proxy_read_timeout_ms: u64,
    pub proxy_write_timeout_secs: u64,

    // Limits (bytes)
    pub max_request_headers_bytes: usize,
    pub max_request_body_bytes: usize,
    pub max_response_headers_bytes: usize,
    pub max_response_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            client_read_timeout_secs: 15,
            proxy_connect_timeout_secs: 5,
            proxy_read_timeout_ms: 5_000,
            proxy_write_timeout_secs: 30,
            max_request_headers_bytes: 64 * 1024,
            max_request_body_bytes: 10 * 1024 * 1024,
            max_response_headers_bytes: 64 * 1024,
            max_response_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl HttpConfig {
    pub fn client_read_timeout(&self) -> Duration {
        Duration::from_secs(self.client_read_timeout_secs)
    }

    pub fn proxy_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_connect_timeout_secs)
    }

    /// Bound on every read from an origin socket.
    pub fn proxy_read_timeout(&self) -> Duration {
        Duration::from_millis(self.proxy_read_timeout_ms)
    }

    pub fn proxy_write_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_write_timeout_secs)
    }

    pub(crate) fn apply_defaults_from(&mut self, defaults: &HttpConfig) {
        if self.client_read_timeout_secs == 0 {
            self.client_read_timeout_secs = defaults.client_read_timeout_secs;
        }
        if self.proxy_connect_timeout_secs == 0 {
            self.proxy_connect_timeout_secs = defaults.proxy_connect_timeout_secs;
        }
        if self.proxy_read_timeout_ms == 0 {
            self.proxy_read_timeout_ms = defaults.proxy_read_timeout_ms;
        }
        if self.proxy_write_timeout_secs == 0 {
            self.proxy_write_timeout_secs = defaults.proxy_write_timeout_secs;
        }
    }
}
