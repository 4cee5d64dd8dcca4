use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (usually the
/// `[server] log_level` value) applies to every `proxima` target and
/// `warn` to everything else.
pub fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(default_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_thread_ids(false),
        )
        .init();
}

fn default_filter(level: &str) -> String {
    format!(
        "warn,proxima={level},proxima_core={level},proxima_proxy={level},proxima_cache={level},proxima_http={level}"
    )
}

#[cfg(test)]
mod tests {
    use super::default_filter;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn default_filter_parses() {
        let directives = default_filter("debug");
        assert!(directives.contains("proxima=debug"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}
