use std::{net::SocketAddr, sync::Arc};

use proxima_config::ProximaConfig;
use proxima_proxy::Dispatcher;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{Instrument, debug, error, info, instrument};

use crate::worker::handle_connection;

pub(crate) async fn bind_listener(listen_addr: &str) -> anyhow::Result<TcpListener> {
    info!(target: "proxima::master", listen = %listen_addr, "Binding listener");

    match TcpListener::bind(listen_addr).await {
        Ok(listener) => {
            info!(target: "proxima::master", listen = %listen_addr, "Bind() successful");
            Ok(listener)
        }
        Err(e) => {
            error!(
                target: "proxima::master",
                listen = %listen_addr,
                error = ?e,
                "Failed to bind listener"
            );
            Err(e.into())
        }
    }
}

struct AcceptedConn {
    stream: TcpStream,
    addr: SocketAddr,
    permit: OwnedSemaphorePermit,
}

/// Takes a permit first, so at most `worker_connections` sockets are open.
async fn accept_with_permit(
    listener: &TcpListener,
    listen_addr: &str,
    semaphore: &Arc<Semaphore>,
) -> anyhow::Result<AcceptedConn> {
    let permit = match semaphore.clone().acquire_owned().await {
        Ok(p) => p,
        Err(e) => {
            error!(
                target: "proxima::master",
                listen = %listen_addr,
                error = ?e,
                "Failed to acquire connection permit"
            );
            return Err(e.into());
        }
    };

    let (stream, addr) = match listener.accept().await {
        Ok(pair) => pair,
        Err(e) => {
            error!(
                target: "proxima::master",
                listen = %listen_addr,
                error = ?e,
                "Failed to accept connection"
            );
            return Err(e.into());
        }
    };

    debug!(
        target: "proxima::master",
        client_addr = %addr,
        available_permits = semaphore.available_permits(),
        "Connection accepted"
    );

    Ok(AcceptedConn {
        stream,
        addr,
        permit,
    })
}

#[instrument(skip(listener, semaphore, dispatcher, cfg), fields(listen = %listen_addr))]
pub(crate) async fn accept_loop(
    listener: TcpListener,
    listen_addr: String,
    semaphore: Arc<Semaphore>,
    dispatcher: Arc<Dispatcher>,
    cfg: Arc<ProximaConfig>,
) -> anyhow::Result<()> {
    info!(target: "proxima::master", listen = %listen_addr, "accept_loop started");

    loop {
        let AcceptedConn {
            stream,
            addr,
            permit,
        } = accept_with_permit(&listener, &listen_addr, &semaphore).await?;

        let dispatcher = dispatcher.clone();
        let cfg = cfg.clone();
        let span = tracing::info_span!("connection", client_addr = %addr);

        tokio::spawn(
            async move {
                let _permit = permit;

                if let Err(e) = handle_connection(Box::new(stream), addr, dispatcher, cfg).await {
                    error!(
                        target: "proxima::worker",
                        client_addr = %addr,
                        error = ?e,
                        "Error while handling connection"
                    );
                }

                debug!(target: "proxima::master", client_addr = %addr, "Permit released");
            }
            .instrument(span),
        );
    }
}
