use std::sync::Arc;

use proxima_config::ProximaConfig;
use proxima_proxy::Dispatcher;
use tracing::{info, instrument, warn};

mod accept;
mod startup;

use accept::{accept_loop, bind_listener};
pub use startup::build_dispatcher;

pub struct Master {
    cfg: Arc<ProximaConfig>,
    dispatcher: Arc<Dispatcher>,
}

impl Master {
    pub fn new(cfg: ProximaConfig, dispatcher: Dispatcher) -> Self {
        Self {
            cfg: Arc::new(cfg),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Binds the listener and serves until Ctrl-C or an accept failure.
    #[instrument(skip(self), fields(
        listen = %self.cfg.server.listen,
        worker_connections = self.cfg.server.worker_connections,
    ))]
    pub async fn run(self) -> anyhow::Result<()> {
        self.log_startup();

        let semaphore = self.init_semaphore();
        let listen_addr = self.cfg.server.listen.clone();
        let listener = bind_listener(&listen_addr).await?;

        tokio::select! {
            res = accept_loop(listener, listen_addr, semaphore, self.dispatcher.clone(), self.cfg.clone()) => {
                warn!(target: "proxima::master", "accept_loop exited");
                res
            }
            _ = tokio::signal::ctrl_c() => {
                info!(target: "proxima::master", "Shutdown signal received; no longer accepting connections");
                Ok(())
            }
        }
    }
}
