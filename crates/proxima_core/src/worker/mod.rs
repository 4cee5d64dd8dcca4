//! Per-connection handler.
//!
//! Reads one client request, answers it and closes the connection.
//! While the dispatcher works, the client half is watched: a reset
//! cancels the request, while a half-close (EOF after the request) still
//! gets its answer. A response the client can no longer take is dropped.

use std::{net::SocketAddr, sync::Arc};

use bytes::BytesMut;
use http::{StatusCode, Version};
use proxima_config::ProximaConfig;
use proxima_http::responses::{error_response, stamp};
use proxima_http::{HttpError, ReadLimits, Response, read_request, write_response};
use proxima_proxy::Dispatcher;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument};

mod admin;

use admin::maybe_handle_cache_admin;

pub trait ClientStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ClientStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

#[instrument(
    skip(stream, dispatcher, cfg),
    fields(
        client = %client_addr,
    )
)]
pub async fn handle_connection(
    stream: Box<dyn ClientStream>,
    client_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    cfg: Arc<ProximaConfig>,
) -> anyhow::Result<()> {
    debug!(target: "proxima::worker", "Handling new client connection");

    let (mut reader, mut writer) = tokio::io::split(stream);
    let limits = client_limits(&cfg);
    let mut buf = BytesMut::with_capacity(8 * 1024);

    let req = match read_request(&mut reader, &mut buf, &limits).await {
        Ok(Some(req)) => req,
        Ok(None) => {
            debug!(target: "proxima::worker", "Client closed before sending a request");
            return Ok(());
        }
        Err(e) => {
            let Some(status) = rejection_status(&e) else {
                debug!(target: "proxima::worker", error = %e, "Client connection lost while reading request");
                return Ok(());
            };
            info!(
                target: "proxima::worker",
                status = status.as_u16(),
                error = %e,
                "Rejecting client request"
            );
            return respond(&mut writer, error_response(status), "GET").await;
        }
    };

    let method = req.method.clone();
    let uri = req.target.clone();

    let res = if let Some(res) = maybe_handle_cache_admin(&req, client_addr, &dispatcher) {
        res
    } else if req.is_method("CONNECT") {
        debug!(target: "proxima::worker", %uri, "CONNECT tunnelling is not supported");
        error_response(StatusCode::NOT_IMPLEMENTED)
    } else {
        tokio::select! {
            res = dispatcher.dispatch(req) => res,
            _ = wait_for_client_reset(&mut reader) => {
                info!(
                    target: "proxima::worker",
                    %method,
                    %uri,
                    "Client went away; request abandoned"
                );
                return Ok(());
            }
        }
    };

    info!(
        target: "proxima::worker",
        %method,
        %uri,
        status = res.status.as_u16(),
        body_len = res.body.len(),
        "Request served"
    );

    respond(&mut writer, res, &method).await
}

fn client_limits(cfg: &ProximaConfig) -> ReadLimits {
    ReadLimits {
        max_headers: cfg.http.max_request_headers_bytes,
        max_body: cfg.http.max_request_body_bytes,
        timeout: cfg.http.client_read_timeout(),
    }
}

/// Status to answer a request that could not be read, `None` when
/// the client is gone and nobody would read an answer.
fn rejection_status(err: &HttpError) -> Option<StatusCode> {
    match err {
        HttpError::Malformed(_) => Some(StatusCode::BAD_REQUEST),
        HttpError::HeadersTooLarge => Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE),
        HttpError::BodyTooLarge => Some(StatusCode::PAYLOAD_TOO_LARGE),
        HttpError::Timeout => Some(StatusCode::REQUEST_TIMEOUT),
        HttpError::Closed | HttpError::Io(_) => None,
    }
}

/// Resolves once reading from the client fails.
///
/// EOF only means the client finished sending (`shutdown(Write)`, HTTP/1.0
/// tools); from then on nothing is watched and the write decides.
async fn wait_for_client_reset<R>(reader: &mut R)
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut scratch = [0u8; 1024];
    loop {
        match reader.read(&mut scratch).await {
            Err(_) => return,
            Ok(0) => std::future::pending::<()>().await,
            // pipelined bytes are never served on this connection
            Ok(_) => continue,
        }
    }
}

async fn respond<W>(writer: &mut W, mut res: Response, request_method: &str) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    stamp(&mut res);
    res.headers.set("Connection", "close");
    res.version = Version::HTTP_11;

    match write_response(writer, &res, request_method).await {
        Ok(()) => {}
        Err(HttpError::Io(e)) => {
            info!(target: "proxima::worker", error = %e, "Client went away; response dropped");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    if let Err(e) = writer.shutdown().await {
        debug!(target: "proxima::worker", error = %e, "Client socket shutdown failed");
    }
    Ok(())
}
