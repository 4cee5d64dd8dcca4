use std::net::SocketAddr;

use crate::ProximaConfig;
use crate::cache::is_valid_table_name;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation output for a loaded proxima configuration.
#[derive(Debug, Default)]
pub struct ConfigReport {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl ConfigReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Render warnings and errors into a readable, multi-line string.
    pub fn format(&self) -> String {
        let mut out = String::new();
        if !self.errors.is_empty() {
            out.push_str("Errors:\n");
            for err in &self.errors {
                out.push_str("  - ");
                out.push_str(err);
                out.push('\n');
            }
        }
        if !self.warnings.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("Warnings:\n");
            for warn in &self.warnings {
                out.push_str("  - ");
                out.push_str(warn);
                out.push('\n');
            }
        }
        out
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

pub(crate) fn validate(cfg: &ProximaConfig) -> ConfigReport {
    let mut report = ConfigReport::default();

    validate_server(cfg, &mut report);
    validate_http(cfg, &mut report);
    validate_cache(cfg, &mut report);

    report
}

fn validate_server(cfg: &ProximaConfig, report: &mut ConfigReport) {
    let listen = cfg.server.listen.trim();
    if listen.parse::<SocketAddr>().is_err() {
        report.error(format!(
            "server.listen '{listen}' is not a valid socket address (expected ip:port)"
        ));
    }

    if !LOG_LEVELS.contains(&cfg.server.log_level.to_ascii_lowercase().as_str()) {
        report.warn(format!(
            "server.log_level '{}' is not one of {LOG_LEVELS:?}; RUST_LOG syntax is passed through as-is",
            cfg.server.log_level
        ));
    }
}

fn validate_http(cfg: &ProximaConfig, report: &mut ConfigReport) {
    let http = &cfg.http;

    if http.max_request_headers_bytes == 0 {
        report.warn("http.max_request_headers_bytes is 0; request header size is unbounded");
    }
    if http.max_request_body_bytes == 0 {
        report.warn("http.max_request_body_bytes is 0; request body size is unbounded");
    }
    if http.max_response_headers_bytes == 0 {
        report.warn("http.max_response_headers_bytes is 0; origin header size is unbounded");
    }
    if http.max_response_body_bytes == 0 {
        report.warn("http.max_response_body_bytes is 0; origin body size is unbounded");
    }
    if http.proxy_read_timeout_ms < 100 {
        report.warn(format!(
            "http.proxy_read_timeout_ms is {}; most origins cannot answer that fast",
            http.proxy_read_timeout_ms
        ));
    }
}

fn validate_cache(cfg: &ProximaConfig, report: &mut ConfigReport) {
    let cache = &cfg.cache;
    if !cache.enabled {
        report.warn("cache.enabled is false; every request is passed through");
        return;
    }

    if !is_valid_table_name(&cache.table) {
        report.error(format!(
            "cache.table '{}' is not a valid SQL identifier",
            cache.table
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let report = validate(&ProximaConfig::default());
        assert!(report.is_ok(), "{}", report.format());
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn bad_listen_and_table_are_errors() {
        let mut cfg = ProximaConfig::default();
        cfg.server.listen = "localhost".into();
        cfg.cache.table = "cache; DROP TABLE x".into();
        let report = validate(&cfg);
        assert_eq!(report.errors().len(), 2);
        assert!(report.format().contains("server.listen"));
    }

    #[test]
    fn disabled_cache_only_warns() {
        let mut cfg = ProximaConfig::default();
        cfg.cache.enabled = false;
        cfg.cache.table = "not valid".into();
        let report = validate(&cfg);
        assert!(report.is_ok());
        assert_eq!(report.warnings().len(), 1);
    }
}
