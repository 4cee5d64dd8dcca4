use proxima_config::ProximaConfig;
use proxima_core::{Master, build_dispatcher};
use utils::init_tracing;

const DEFAULT_CONFIG: &str = "proxima.conf";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let (cfg, notes) = ProximaConfig::load_or_default(&path);
    init_tracing(cfg.server.log_level());
    notes.log();
    cfg.log_summary();

    let dispatcher = build_dispatcher(&cfg).await;
    Master::new(cfg, dispatcher).run().await?;

    Ok(())
}
