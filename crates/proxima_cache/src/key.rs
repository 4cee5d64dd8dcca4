use std::fmt;

use proxima_http::Request;

/// Absolute request URI of a GET, used verbatim as the store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Absolute-form targets are used as-is. Origin-form targets are
    /// completed with the `Host` header (`http://{host}{path}`).
    pub fn for_request(req: &Request) -> Option<Self> {
        let target = req.target.as_str();
        if target.contains("://") {
            return Some(Self(target.to_string()));
        }
        if target.starts_with('/') {
            let host = req.headers.get("host")?.trim();
            if host.is_empty() {
                return None;
            }
            return Some(Self(format!("http://{host}{target}")));
        }
        None
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheKey {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// `host[:port]` part of an absolute URL.
pub fn url_authority(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if authority.is_empty() { None } else { Some(authority) }
}
