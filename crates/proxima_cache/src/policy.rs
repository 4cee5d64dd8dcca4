use proxima_http::{Request, Response};

/// Stateless cacheability rules.
pub struct CachePolicy;

impl CachePolicy {
    /// A pair is cacheable when all of these hold:
    /// GET request, 200 response, no chunked transfer coding, no
    /// `Cache-Control: no-store`/`no-cache`, and a `Last-Modified` header.
    pub fn is_cacheable(req: &Request, res: &Response) -> bool {
        req.is_method("GET")
            && res.status.as_u16() == 200
            && !res.headers.has_token("transfer-encoding", "chunked")
            && !forbids_cache(res.headers.get_all("cache-control"))
            && res.headers.contains("last-modified")
    }

    /// False when the client itself asked for `no-store` or `no-cache`.
    pub fn can_attempt_lookup(req: &Request) -> bool {
        !forbids_cache(req.headers.get_all("cache-control"))
    }
}

// Only the exact values `no-store` and `no-cache` count; `private`,
// `max-age=0`, lists and other spellings are ignored.
fn forbids_cache<'a>(mut values: impl Iterator<Item = &'a str>) -> bool {
    values.any(|v| matches!(v.trim(), "no-store" | "no-cache"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn get() -> Request {
        Request::new("GET", "http://example.com/a")
    }

    fn ok() -> Response {
        Response::new(StatusCode::OK).with_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
    }

    #[test]
    fn plain_200_with_last_modified_is_cacheable() {
        assert!(CachePolicy::is_cacheable(&get(), &ok()));
        assert!(CachePolicy::is_cacheable(&Request::new("get", "http://example.com/a"), &ok()));
    }

    #[test]
    fn non_200_is_never_cacheable() {
        for code in [201u16, 203, 204, 206, 301, 304, 404, 500] {
            let mut res = ok();
            res.status = StatusCode::from_u16(code).unwrap();
            assert!(!CachePolicy::is_cacheable(&get(), &res), "status {code}");
        }
    }

    #[test]
    fn missing_last_modified_is_never_cacheable() {
        let res = Response::new(StatusCode::OK).with_header("Cache-Control", "public");
        assert!(!CachePolicy::is_cacheable(&get(), &res));
    }

    #[test]
    fn other_methods_are_not_cacheable() {
        let req = Request::new("HEAD", "http://example.com/a");
        assert!(!CachePolicy::is_cacheable(&req, &ok()));
    }

    #[test]
    fn chunked_and_cache_control_disqualify() {
        let chunked = ok().with_header("Transfer-Encoding", "chunked");
        assert!(!CachePolicy::is_cacheable(&get(), &chunked));

        let no_store = ok().with_header("Cache-Control", "no-store");
        assert!(!CachePolicy::is_cacheable(&get(), &no_store));

        let no_cache = ok().with_header("Cache-Control", "no-cache");
        assert!(!CachePolicy::is_cacheable(&get(), &no_cache));

        // not one of the two literal values
        let private = ok().with_header("Cache-Control", "private, max-age=0");
        assert!(CachePolicy::is_cacheable(&get(), &private));
    }

    #[test]
    fn client_no_store_bypasses_lookup() {
        assert!(CachePolicy::can_attempt_lookup(&get()));
        let req = get().with_header("Cache-Control", "no-store");
        assert!(!CachePolicy::can_attempt_lookup(&req));
        let req = get().with_header("cache-control", "no-cache");
        assert!(!CachePolicy::can_attempt_lookup(&req));
    }

    #[test]
    fn only_exact_values_disqualify() {
        for value in ["NO-CACHE", "No-Store", "no-store, max-age=0"] {
            let req = get().with_header("Cache-Control", value);
            assert!(CachePolicy::can_attempt_lookup(&req), "{value}");
            let res = ok().with_header("Cache-Control", value);
            assert!(CachePolicy::is_cacheable(&get(), &res), "{value}");
        }
    }
}
