//! Cache validation engine.
//!
//! Per GET request:
//!
//! ```text
//! lookup ──none──▶ MISS: plain fetch, store if cacheable
//!    │
//!  record
//!    │ conditional GET (If-Modified-Since = stored Last-Modified)
//!    ├─ 304 ───────▶ SERVE_CACHED: stored headers + body, store untouched
//!    ├─ 200 ───────▶ REFRESH: new response to the client, replaces the record
//!    └─ other/err ─▶ INVALIDATE: delete record, plain fetch of the original
//! ```
//!
//! The probe always finishes before a fallback fetch starts.

use std::sync::Arc;

use http::StatusCode;
use proxima_cache::{
    CacheEvent, CacheKey, CacheMetrics, CachePolicy, CacheRecord, CacheStore, url_authority,
};
use proxima_http::{Request, Response};
use tracing::{debug, info, instrument, warn};

use crate::error::ForwardError;
use crate::forward::Origin;
use crate::locks::KeyLocks;

/// Terminal state reached for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Miss,
    ServeCached,
    Refresh,
    Invalidate,
}

#[derive(Debug)]
pub struct Validated {
    pub outcome: Outcome,
    pub response: Response,
}

pub struct CacheValidator {
    store: Arc<dyn CacheStore>,
    origin: Arc<dyn Origin>,
    metrics: Arc<CacheMetrics>,
    locks: Option<KeyLocks>,
}

impl CacheValidator {
    pub fn new(store: Arc<dyn CacheStore>, origin: Arc<dyn Origin>, metrics: Arc<CacheMetrics>) -> Self {
        Self {
            store,
            origin,
            metrics,
            locks: None,
        }
    }

    /// Serializes whole lookup → probe → store/delete sequences per key.
    pub fn with_key_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Runs the state machine for a GET whose client allowed caching.
    ///
    /// Only a failure of the final, authoritative fetch is returned;
    /// probe failures are absorbed as invalidations.
    #[instrument(skip(self, key, req), fields(url = %key))]
    pub async fn handle(&self, key: &CacheKey, req: Request) -> Result<Validated, ForwardError> {
        let _guard = match &self.locks {
            Some(locks) => Some(locks.lock(key.as_str()).await),
            None => None,
        };

        self.metrics.record(CacheEvent::Lookup);

        let Some(record) = self.store.get(key.as_str()).await else {
            self.metrics.record(CacheEvent::Miss);
            debug!(target: "proxima::cache", url = %key, "No cached record");
            let response = self.fetch_and_store(key, &req).await?;
            return Ok(Validated {
                outcome: Outcome::Miss,
                response,
            });
        };

        let probe = conditional_probe(&record);
        match self.origin.forward(probe).await {
            Ok(res) if res.status == StatusCode::NOT_MODIFIED => {
                self.metrics.record(CacheEvent::Hit);
                info!(target: "proxima::cache", url = %key, "Not modified; serving cached record");
                Ok(Validated {
                    outcome: Outcome::ServeCached,
                    response: record.to_response(),
                })
            }
            Ok(res) if res.status == StatusCode::OK => {
                self.metrics.record(CacheEvent::Refresh);
                info!(target: "proxima::cache", url = %key, "Modified; refreshing cached record");
                if !self.store_if_cacheable(key, &req, &res).await {
                    // the stored body is known to be stale
                    self.store.delete(key.as_str()).await;
                }
                Ok(Validated {
                    outcome: Outcome::Refresh,
                    response: res,
                })
            }
            Ok(res) => {
                info!(
                    target: "proxima::cache",
                    url = %key,
                    status = res.status.as_u16(),
                    "Probe answered neither 304 nor 200; invalidating"
                );
                self.invalidate_and_refetch(key, &req).await
            }
            Err(e) => {
                warn!(target: "proxima::cache", url = %key, error = %e, "Probe failed; invalidating");
                self.invalidate_and_refetch(key, &req).await
            }
        }
    }

    /// Stores `res` under `key` if the pair is cacheable and within the
    /// persisted size limits. Returns whether a record was written.
    pub async fn store_if_cacheable(&self, key: &CacheKey, req: &Request, res: &Response) -> bool {
        if !CachePolicy::is_cacheable(req, res) {
            debug!(
                target: "proxima::cache",
                url = %key,
                status = res.status.as_u16(),
                "Response not cacheable"
            );
            return false;
        }

        let record = CacheRecord::from_response(key.as_str(), res);
        if !record.fits_limits() {
            self.metrics.record(CacheEvent::SkippedOversize);
            debug!(
                target: "proxima::cache",
                url = %key,
                body_len = record.body.len(),
                "Record exceeds persisted size limits; not stored"
            );
            return false;
        }

        self.store.put(key.as_str(), record).await;
        self.metrics.record(CacheEvent::Store);
        debug!(target: "proxima::cache", url = %key, body_len = res.body.len(), "Stored record");
        true
    }

    async fn invalidate_and_refetch(&self, key: &CacheKey, req: &Request) -> Result<Validated, ForwardError> {
        self.store.delete(key.as_str()).await;
        self.metrics.record(CacheEvent::Invalidate);

        let response = self.fetch_and_store(key, req).await?;
        Ok(Validated {
            outcome: Outcome::Invalidate,
            response,
        })
    }

    async fn fetch_and_store(&self, key: &CacheKey, req: &Request) -> Result<Response, ForwardError> {
        let res = self.origin.forward(req.clone()).await?;
        self.store_if_cacheable(key, req, &res).await;
        Ok(res)
    }
}

/// `GET <url>` with `If-Modified-Since`, `Connection: close` and the
/// record's own host. Nothing from the client request is carried over.
fn conditional_probe(record: &CacheRecord) -> Request {
    let mut probe = Request::new("GET", record.url.clone());

    if let Some(authority) = url_authority(&record.url) {
        probe.headers.append("Host", authority);
    }
    match record.last_modified() {
        Some(last_modified) => probe.headers.append("If-Modified-Since", last_modified),
        None => warn!(target: "proxima::cache", url = %record.url, "Cached record has no Last-Modified"),
    }
    probe.headers.append("Connection", "close");

    probe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingStore, ScriptedOrigin, get, ok_with, status};
    use proxima_cache::{MAX_BODY_LEN, MemoryStore};

    const URL: &str = "http://example.com/a";
    const D1: &str = "Wed, 21 Oct 2015 07:28:00 GMT";
    const D2: &str = "Thu, 22 Oct 2015 07:28:00 GMT";

    fn key() -> CacheKey {
        CacheKey::for_request(&get(URL)).unwrap()
    }

    fn validator(store: Arc<dyn CacheStore>, origin: Arc<ScriptedOrigin>) -> (CacheValidator, Arc<CacheMetrics>) {
        let metrics = Arc::new(CacheMetrics::new());
        let v = CacheValidator::new(store, origin, Arc::clone(&metrics)).with_key_locks(KeyLocks::new());
        (v, metrics)
    }

    async fn seeded(store: &MemoryStore, last_modified: &str, body: &'static [u8]) {
        let res = ok_with(last_modified, body);
        store.put(URL, CacheRecord::from_response(URL, &res)).await;
    }

    #[tokio::test]
    async fn miss_fetches_and_stores() {
        let store = Arc::new(MemoryStore::new());
        let origin = Arc::new(ScriptedOrigin::new().reply(ok_with(D1, b"first")));
        let (v, metrics) = validator(store.clone(), origin.clone());

        let out = v.handle(&key(), get(URL)).await.unwrap();

        assert_eq!(out.outcome, Outcome::Miss);
        assert_eq!(&out.response.body[..], b"first");
        let rec = store.get(URL).await.unwrap();
        assert_eq!(rec.last_modified(), Some(D1));
        assert_eq!(origin.requests().len(), 1);
        assert_eq!(metrics.snapshot().stores, 1);
    }

    #[tokio::test]
    async fn not_modified_serves_stored_record() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, D1, b"cached").await;
        let before = store.get(URL).await.unwrap();
        let origin = Arc::new(ScriptedOrigin::new().reply(status(304)));
        let (v, metrics) = validator(store.clone(), origin.clone());

        let out = v.handle(&key(), get(URL)).await.unwrap();

        assert_eq!(out.outcome, Outcome::ServeCached);
        assert_eq!(out.response.status, StatusCode::OK);
        assert_eq!(out.response.headers, before.headers);
        assert_eq!(out.response.body, before.body);
        assert_eq!(store.get(URL).await.unwrap(), before);
        assert_eq!(metrics.snapshot().hits, 1);
    }

    #[tokio::test]
    async fn probe_is_a_bare_conditional_get() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, D1, b"cached").await;
        let origin = Arc::new(ScriptedOrigin::new().reply(status(304)));
        let (v, _) = validator(store, origin.clone());

        let req = get(URL)
            .with_header("Cookie", "secret=1")
            .with_header("Host", "example.com");
        v.handle(&key(), req).await.unwrap();

        let probe = &origin.requests()[0];
        assert_eq!(probe.method, "GET");
        assert_eq!(probe.target, URL);
        assert_eq!(probe.headers.get("if-modified-since"), Some(D1));
        assert_eq!(probe.headers.get("connection"), Some("close"));
        assert_eq!(probe.headers.get("host"), Some("example.com"));
        assert!(!probe.headers.contains("cookie"));
    }

    #[tokio::test]
    async fn modified_replaces_record() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, D1, b"old").await;
        let origin = Arc::new(ScriptedOrigin::new().reply(ok_with(D2, b"new")));
        let (v, _) = validator(store.clone(), origin.clone());

        let out = v.handle(&key(), get(URL)).await.unwrap();

        assert_eq!(out.outcome, Outcome::Refresh);
        assert_eq!(&out.response.body[..], b"new");
        let rec = store.get(URL).await.unwrap();
        assert_eq!(rec.last_modified(), Some(D2));
        assert_eq!(&rec.body[..], b"new");
        assert_eq!(rec.body, out.response.body);
        assert_eq!(origin.requests().len(), 1);
    }

    #[tokio::test]
    async fn modified_but_uncacheable_drops_stale_record() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, D1, b"old").await;
        let fresh = status(200).with_body(bytes::Bytes::from_static(b"new"));
        let origin = Arc::new(ScriptedOrigin::new().reply(fresh));
        let (v, _) = validator(store.clone(), origin);

        let out = v.handle(&key(), get(URL)).await.unwrap();

        assert_eq!(out.outcome, Outcome::Refresh);
        assert!(store.get(URL).await.is_none());
    }

    #[tokio::test]
    async fn other_status_invalidates_and_refetches() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, D1, b"old").await;
        let gone = status(404).with_body(bytes::Bytes::from_static(b"gone"));
        let origin = Arc::new(ScriptedOrigin::new().reply(status(404)).reply(gone));
        let (v, metrics) = validator(store.clone(), origin.clone());

        let out = v.handle(&key(), get(URL)).await.unwrap();

        assert_eq!(out.outcome, Outcome::Invalidate);
        assert_eq!(out.response.status, StatusCode::NOT_FOUND);
        assert_eq!(&out.response.body[..], b"gone");
        assert!(store.get(URL).await.is_none());

        let requests = origin.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].headers.contains("if-modified-since"));
        assert!(!requests[1].headers.contains("if-modified-since"));
        assert_eq!(metrics.snapshot().invalidations, 1);
    }

    #[tokio::test]
    async fn probe_failure_is_treated_as_invalidation() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, D1, b"old").await;
        let origin = Arc::new(
            ScriptedOrigin::new()
                .fail(ForwardError::Io(std::io::Error::other("reset")))
                .reply(ok_with(D2, b"fresh")),
        );
        let (v, _) = validator(store.clone(), origin);

        let out = v.handle(&key(), get(URL)).await.unwrap();

        assert_eq!(out.outcome, Outcome::Invalidate);
        assert_eq!(&out.response.body[..], b"fresh");
        // the refetch was independently cacheable
        assert_eq!(store.get(URL).await.unwrap().last_modified(), Some(D2));
    }

    #[tokio::test]
    async fn failed_final_fetch_propagates() {
        let store = Arc::new(MemoryStore::new());
        let origin = Arc::new(ScriptedOrigin::new().fail(ForwardError::UnknownHost("example.com".into())));
        let (v, _) = validator(store.clone(), origin);

        let err = v.handle(&key(), get(URL)).await.unwrap_err();
        assert!(matches!(err, ForwardError::UnknownHost(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn oversize_body_is_never_stored() {
        static BIG: [u8; 70_000] = [b'x'; 70_000];
        assert!(BIG.len() > MAX_BODY_LEN);

        let store = Arc::new(CountingStore::new());
        let origin = Arc::new(ScriptedOrigin::new().reply(ok_with(D1, &BIG)));
        let (v, metrics) = validator(store.clone(), origin);

        let out = v.handle(&key(), get(URL)).await.unwrap();

        assert_eq!(out.response.body.len(), 70_000);
        assert_eq!(store.puts(), 0);
        assert!(store.inner.get(URL).await.is_none());
        assert_eq!(metrics.snapshot().skipped_oversize, 1);
    }

    #[tokio::test]
    async fn oversize_url_is_never_stored() {
        let long = format!("http://example.com/{}", "p".repeat(300));
        let store = Arc::new(CountingStore::new());
        let origin = Arc::new(ScriptedOrigin::new().reply(ok_with(D1, b"x")));
        let (v, _) = validator(store.clone(), origin);

        let key = CacheKey::for_request(&get(&long)).unwrap();
        v.handle(&key, get(&long)).await.unwrap();

        assert_eq!(store.puts(), 0);
        assert_eq!(store.deletes(), 0);
    }
}
