use bytes::Bytes;
use http::StatusCode;
use proxima_http::{Headers, Response};

/// Longest URL that may be persisted, in characters.
pub const MAX_URL_LEN: usize = 255;
/// Largest body that may be persisted, in bytes.
pub const MAX_BODY_LEN: usize = 65_535;

/// One cached GET response: the header block and body exactly as relayed.
///
/// Records are replaced whole, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl CacheRecord {
    pub fn new(url: impl Into<String>, headers: Headers, body: Bytes) -> Self {
        Self {
            url: url.into(),
            headers,
            body,
        }
    }

    /// Builds a record sharing the response's body buffer.
    pub fn from_response(url: impl Into<String>, res: &Response) -> Self {
        Self::new(url, res.headers.clone(), res.body.clone())
    }

    /// The revalidation token sent back as `If-Modified-Since`.
    pub fn last_modified(&self) -> Option<&str> {
        self.headers.get("last-modified")
    }

    pub fn fits_limits(&self) -> bool {
        self.url.chars().count() <= MAX_URL_LEN && self.body.len() <= MAX_BODY_LEN
    }

    /// Client response rebuilt from the stored header block and body.
    pub fn to_response(&self) -> Response {
        let mut res = Response::new(StatusCode::OK);
        res.headers = self.headers.clone();
        res.body = self.body.clone();
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, body_len: usize) -> CacheRecord {
        let mut headers = Headers::new();
        headers.append("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT");
        CacheRecord::new(url, headers, Bytes::from(vec![b'x'; body_len]))
    }

    #[test]
    fn limits_are_inclusive() {
        assert!(record("http://a/", MAX_BODY_LEN).fits_limits());
        assert!(!record("http://a/", MAX_BODY_LEN + 1).fits_limits());

        let long_url = format!("http://a/{}", "p".repeat(MAX_URL_LEN - 9));
        assert_eq!(long_url.len(), MAX_URL_LEN);
        assert!(record(&long_url, 1).fits_limits());
        assert!(!record(&format!("{long_url}q"), 1).fits_limits());
    }

    #[test]
    fn response_round_trip_keeps_headers() {
        let rec = record("http://a/", 3);
        let res = rec.to_response();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.headers, rec.headers);
        assert_eq!(res.body, rec.body);
        assert_eq!(CacheRecord::from_response("http://a/", &res), rec);
    }
}
