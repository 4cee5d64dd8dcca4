use std::net::{IpAddr, SocketAddr};

use http::StatusCode;
use http::uri::Authority;
use proxima_cache::MetricsSnapshot;
use proxima_http::responses::{error_response, internal_error, json_response};
use proxima_http::{Request, Response};
use proxima_proxy::Dispatcher;
use serde::Serialize;
use tracing::{debug, warn};

const CACHE_ADMIN_PATH: &str = "/_proxima/cache";

#[derive(Serialize)]
struct CacheReport<'a> {
    backend: &'a str,
    #[serde(flatten)]
    metrics: MetricsSnapshot,
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

/// Answers `/_proxima/cache` for loopback clients.
///
/// Returns `None` for every other request; those go to the dispatcher.
pub(crate) fn maybe_handle_cache_admin(
    req: &Request,
    client_addr: SocketAddr,
    dispatcher: &Dispatcher,
) -> Option<Response> {
    // absolute-form targets are always proxied
    if !req.target.starts_with('/') {
        return None;
    }

    let mut path = strip_query(&req.target);
    if path.len() > 1 {
        path = path.trim_end_matches('/');
    }
    if path != CACHE_ADMIN_PATH || !addressed_to_proxy(req) {
        return None;
    }

    if !client_addr.ip().is_loopback() {
        debug!(target: "proxima::worker", %client_addr, "Admin endpoint refused to remote client");
        return Some(error_response(StatusCode::NOT_FOUND));
    }

    if !req.is_method("GET") && !req.is_method("HEAD") {
        let mut res = error_response(StatusCode::METHOD_NOT_ALLOWED);
        res.headers.set("Allow", "GET, HEAD");
        return Some(res);
    }

    let report = CacheReport {
        backend: dispatcher.cache_backend(),
        metrics: dispatcher.metrics().snapshot(),
    };
    let body = match serde_json::to_vec(&report) {
        Ok(body) => body,
        Err(e) => {
            warn!(target: "proxima::worker", error = %e, "Cannot encode cache report");
            return Some(internal_error());
        }
    };

    // the writer drops the body of a HEAD answer
    Some(json_response(StatusCode::OK, body))
}

/// Origin-form requests reach the admin page only when `Host` is absent
/// or names this machine; any other host is a transparent request for
/// that origin.
fn addressed_to_proxy(req: &Request) -> bool {
    let Some(host) = req.headers.get("host").map(str::trim) else {
        return true;
    };
    let Ok(authority) = host.parse::<Authority>() else {
        return false;
    };
    let name = authority.host().trim_start_matches('[').trim_end_matches(']');
    name.eq_ignore_ascii_case("localhost") || name.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
