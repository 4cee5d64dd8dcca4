use http::Uri;
use http::uri::Authority;
use proxima_http::Request;

use crate::error::ForwardError;

const DEFAULT_PORT: u16 = 80;

/// Origin host and port a request is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    /// `host` or `host:port` when the port is not 80, for the `Host` header.
    pub fn authority(&self) -> String {
        if self.port == DEFAULT_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Host without IPv6 brackets, as DNS lookup expects it.
    pub fn lookup_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }
}

/// `Host` header first, then the absolute request URI. Port defaults to 80.
pub fn resolve_target(req: &Request) -> Result<Target, ForwardError> {
    if let Some(host) = req.headers.get("host").map(str::trim).filter(|h| !h.is_empty()) {
        let authority: Authority = host
            .parse()
            .map_err(|_| ForwardError::UnknownHost(host.to_string()))?;
        return target_from(authority.host(), authority.port_u16());
    }

    let uri: Uri = req
        .target
        .parse()
        .map_err(|_| ForwardError::UnknownHost(req.target.clone()))?;
    match uri.host() {
        Some(host) => target_from(host, uri.port_u16()),
        None => Err(ForwardError::UnknownHost(req.target.clone())),
    }
}

fn target_from(host: &str, port: Option<u16>) -> Result<Target, ForwardError> {
    if host.is_empty() {
        return Err(ForwardError::UnknownHost(String::new()));
    }
    Ok(Target {
        host: host.to_string(),
        port: port.unwrap_or(DEFAULT_PORT),
    })
}

/// Request-line target sent to the origin: `/path?query`.
pub fn origin_form(target: &str) -> String {
    if target.starts_with('/') || target == "*" {
        return target.to_string();
    }
    match target.parse::<Uri>() {
        Ok(uri) => uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .filter(|pq| pq.starts_with('/'))
            .unwrap_or("/")
            .to_string(),
        Err(_) => target.to_string(),
    }
}
