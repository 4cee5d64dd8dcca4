use serde::Deserialize;
use tracing::{error, info, warn};

use crate::validation::{ConfigReport, validate};
use crate::{CacheConfig, HttpConfig, ServerConfig};

const ENV_PREFIX: &str = "PROXIMA";

// =======================================================
// PROXIMA CONFIG: main config
// =======================================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProximaConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// What happened while loading; logged once tracing is up.
#[derive(Debug)]
pub struct LoadNotes {
    source: String,
    report: ConfigReport,
    fallback: Option<String>,
}

impl LoadNotes {
    pub fn used_defaults(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn report(&self) -> &ConfigReport {
        &self.report
    }

    pub fn log(&self) {
        if let Some(reason) = &self.fallback {
            error!(
                target: "proxima::config",
                source = %self.source,
                reason = %reason,
                "Invalid configuration; using built-in defaults"
            );
        }
        if self.report.has_errors() || !self.report.warnings().is_empty() {
            warn!(
                target: "proxima::config",
                source = %self.source,
                "Configuration report:\n{}",
                self.report.format()
            );
        }
    }
}

impl ProximaConfig {
    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn http(&self) -> &HttpConfig {
        &self.http
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    /// Validate the configuration and return a report of warnings and errors.
    pub fn validate(&self) -> ConfigReport {
        validate(self)
    }

    /// Loads `file_name` (INI, optional) overlaid with `PROXIMA_*` variables,
    /// e.g. `PROXIMA_SERVER__LISTEN=127.0.0.1:3128`.
    pub fn from_file(file_name: &str) -> Result<Self, config::ConfigError> {
        let built = config::Config::builder()
            .add_source(config::File::new(file_name, config::FileFormat::Ini).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: ProximaConfig = built.try_deserialize()?;
        cfg.apply_defaults();
        Ok(cfg)
    }

    /// Never fails: load errors or validation errors fall back to defaults.
    /// Runs before logging exists, so findings are returned as `LoadNotes`.
    pub fn load_or_default(file_name: &str) -> (Self, LoadNotes) {
        match Self::from_file(file_name) {
            Ok(cfg) => {
                let report = cfg.validate();
                if report.has_errors() {
                    let notes = LoadNotes {
                        source: file_name.to_string(),
                        report,
                        fallback: Some("validation failed".into()),
                    };
                    (ProximaConfig::default(), notes)
                } else {
                    let notes = LoadNotes {
                        source: file_name.to_string(),
                        report,
                        fallback: None,
                    };
                    (cfg, notes)
                }
            }
            Err(e) => {
                let notes = LoadNotes {
                    source: file_name.to_string(),
                    report: ConfigReport::default(),
                    fallback: Some(e.to_string()),
                };
                (ProximaConfig::default(), notes)
            }
        }
    }

    fn apply_defaults(&mut self) {
        self.server.apply_defaults_from(&ServerConfig::default());
        self.http.apply_defaults_from(&HttpConfig::default());
        self.cache.apply_defaults_from(&CacheConfig::default());
    }

    /// Effective configuration at `info`, one event per section.
    pub fn log_summary(&self) {
        info!(
            target: "proxima::config",
            listen = %self.server.listen,
            worker_connections = self.server.worker_connections,
            log_level = %self.server.log_level,
            "[server]"
        );
        info!(
            target: "proxima::config",
            client_read_timeout_secs = self.http.client_read_timeout_secs,
            proxy_connect_timeout_secs = self.http.proxy_connect_timeout_secs,
            proxy_read_timeout_ms = self.http.proxy_read_timeout_ms,
            proxy_write_timeout_secs = self.http.proxy_write_timeout_secs,
            max_request_headers_bytes = self.http.max_request_headers_bytes,
            max_request_body_bytes = self.http.max_request_body_bytes,
            max_response_headers_bytes = self.http.max_response_headers_bytes,
            max_response_body_bytes = self.http.max_response_body_bytes,
            "[http]"
        );
        info!(
            target: "proxima::config",
            enabled = self.cache.enabled,
            backend = self.cache.backend.as_str(),
            db_path = %self.cache.db_path,
            table = %self.cache.table,
            serialize_per_key = self.cache.serialize_per_key,
            "[cache]"
        );
    }
}
