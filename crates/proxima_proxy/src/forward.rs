use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::BytesMut;
use http::Version;
use proxima_config::HttpConfig;
use proxima_http::{ReadLimits, Request, Response, encode_request, read_response};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpStream, lookup_host},
    time::{Duration, timeout},
};
use tracing::{debug, instrument, warn};

use crate::error::ForwardError;
use crate::sanitize::{sanitize_request, sanitize_response};
use crate::target::{Target, origin_form, resolve_target};

const USER_AGENT: &str = concat!("proxima/", env!("CARGO_PKG_VERSION"));

/// Carries one request to its origin and returns the fully buffered response.
///
/// Implemented over TCP by `TcpOrigin`; tests script it in-process.
#[async_trait]
pub trait Origin: Send + Sync {
    async fn forward(&self, req: Request) -> Result<Response, ForwardError>;
}

/// Timeouts and size caps for origin exchanges.
#[derive(Debug, Clone)]
pub struct ForwardSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_response_headers: usize,
    pub max_response_body: usize,
}

impl Default for ForwardSettings {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for ForwardSettings {
    fn from(http: &HttpConfig) -> Self {
        Self {
            connect_timeout: http.proxy_connect_timeout(),
            read_timeout: http.proxy_read_timeout(),
            write_timeout: http.proxy_write_timeout(),
            max_response_headers: http.max_response_headers_bytes,
            max_response_body: http.max_response_body_bytes,
        }
    }
}

/// =======================================================
/// TCP ORIGIN
/// =======================================================
///
/// One fresh connection per call, never reused:
/// - resolve host/port (Host header, else absolute URI, port 80)
/// - connect
/// - strip hop-by-hop headers, send `Connection: close`
/// - read the whole response into memory
/// - strip hop-by-hop headers from the response
/// - recompute `Content-Length` from the buffered body
///
/// The socket is shut down whether the exchange worked or not.
#[derive(Debug, Clone, Default)]
pub struct TcpOrigin {
    settings: ForwardSettings,
}

impl TcpOrigin {
    pub fn new(settings: ForwardSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(http: &HttpConfig) -> Self {
        Self::new(ForwardSettings::from(http))
    }

    async fn resolve(&self, target: &Target) -> Result<Vec<SocketAddr>, ForwardError> {
        let lookup = lookup_host((target.lookup_host(), target.port));
        match timeout(self.settings.connect_timeout, lookup).await {
            Ok(Ok(addrs)) => {
                let addrs: Vec<SocketAddr> = addrs.collect();
                if addrs.is_empty() {
                    Err(ForwardError::UnknownHost(target.host.clone()))
                } else {
                    Ok(addrs)
                }
            }
            Ok(Err(e)) => {
                debug!(target: "proxima::forward", host = %target.host, error = %e, "DNS lookup failed");
                Err(ForwardError::UnknownHost(target.host.clone()))
            }
            Err(_) => {
                debug!(target: "proxima::forward", host = %target.host, "DNS lookup timed out");
                Err(ForwardError::UnknownHost(target.host.clone()))
            }
        }
    }

    async fn connect(&self, target: &Target, addrs: &[SocketAddr]) -> Result<TcpStream, ForwardError> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no address to connect to");

        for addr in addrs {
            match timeout(self.settings.connect_timeout, TcpStream::connect(*addr)).await {
                Ok(Ok(stream)) => {
                    debug!(target: "proxima::forward", origin = %addr, "Connected to origin");
                    return Ok(stream);
                }
                Ok(Err(e)) => last_err = e,
                Err(_) => {
                    last_err = io::Error::new(io::ErrorKind::TimedOut, format!("connect to {addr} timed out"));
                }
            }
        }

        Err(ForwardError::ConnectFailed {
            addr: target.authority(),
            source: last_err,
        })
    }

    async fn exchange(&self, stream: &mut TcpStream, req: &Request) -> Result<Response, ForwardError> {
        let wire = encode_request(req);
        match timeout(self.settings.write_timeout, stream.write_all(&wire)).await {
            Ok(res) => res?,
            Err(_) => {
                return Err(ForwardError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "origin write timed out",
                )));
            }
        }

        let limits = ReadLimits {
            max_headers: self.settings.max_response_headers,
            max_body: self.settings.max_response_body,
            timeout: self.settings.read_timeout,
        };
        let mut buf = BytesMut::with_capacity(8 * 1024);

        // 100 Continue and friends precede the real answer
        loop {
            let res = read_response(stream, &mut buf, &req.method, &limits).await?;
            if res.status.is_informational() && res.status.as_u16() != 101 {
                debug!(target: "proxima::forward", status = res.status.as_u16(), "Skipping interim response");
                continue;
            }
            return Ok(res);
        }
    }
}

#[async_trait]
impl Origin for TcpOrigin {
    #[instrument(skip(self, req), fields(method = %req.method, uri = %req.target))]
    async fn forward(&self, req: Request) -> Result<Response, ForwardError> {
        let target = resolve_target(&req)?;
        let is_head = req.is_method("HEAD");
        let outbound = prepare_outbound(req, &target);

        let addrs = self.resolve(&target).await?;
        let mut stream = self.connect(&target, &addrs).await?;

        debug!(
            target: "proxima::forward",
            headers = ?outbound.headers.as_pairs(),
            "Outbound request headers"
        );

        let result = self.exchange(&mut stream, &outbound).await;

        if let Err(e) = stream.shutdown().await {
            debug!(target: "proxima::forward", error = %e, "Origin socket shutdown failed");
        }
        drop(stream);

        let mut res = match result {
            Ok(res) => res,
            Err(e) => {
                warn!(target: "proxima::forward", origin = %target.authority(), error = %e, "Origin exchange failed");
                return Err(e);
            }
        };

        // a HEAD answer has no body; its length describes the GET representation
        let head_length = if is_head {
            res.headers.get("content-length").map(str::to_string)
        } else {
            None
        };

        sanitize_response(&mut res);
        if let Some(len) = head_length {
            res.headers.set("Content-Length", len);
        } else if !res.is_bodiless() && !is_head {
            let body = res.body.clone();
            res.set_body(body);
        }

        debug!(
            target: "proxima::forward",
            status = res.status.as_u16(),
            body_len = res.body.len(),
            headers = ?res.headers.as_pairs(),
            "Origin response"
        );

        Ok(res)
    }
}

fn prepare_outbound(mut req: Request, target: &Target) -> Request {
    sanitize_request(&mut req);
    req.target = origin_form(&req.target);
    req.version = Version::HTTP_11;
    if !req.headers.contains("host") {
        req.headers.append("Host", target.authority());
    }
    req.headers.set("Connection", "close");
    req.headers.set_if_absent("User-Agent", USER_AGENT);
    req
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_request_is_origin_form_and_closes() {
        let req = Request::new("GET", "http://example.com:8080/a?b=1")
            .with_header("Proxy-Authenticate", "x")
            .with_header("Accept-Encoding", "gzip")
            .with_header("Connection", "keep-alive");
        let target = resolve_target(&req).unwrap();
        let out = prepare_outbound(req, &target);

        assert_eq!(out.target, "/a?b=1");
        assert_eq!(out.headers.get("host"), Some("example.com:8080"));
        assert_eq!(out.headers.get("connection"), Some("close"));
        assert!(out.headers.get("user-agent").unwrap().starts_with("proxima/"));
        assert!(!out.headers.contains("proxy-authenticate"));
        assert!(!out.headers.contains("accept-encoding"));
    }

    #[test]
    fn client_user_agent_is_kept() {
        let req = Request::new("GET", "/").with_header("Host", "a").with_header("User-Agent", "curl/8");
        let target = resolve_target(&req).unwrap();
        let out = prepare_outbound(req, &target);
        assert_eq!(out.headers.get_all("user-agent").collect::<Vec<_>>(), vec!["curl/8"]);
    }

    #[test]
    fn settings_follow_http_config() {
        let mut http = HttpConfig::default();
        http.proxy_read_timeout_ms = 250;
        let settings = ForwardSettings::from(&http);
        assert_eq!(settings.read_timeout, Duration::from_millis(250));
        assert_eq!(settings.max_response_body, http.max_response_body_bytes);
    }
}
