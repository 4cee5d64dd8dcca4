//! In-process doubles for the origin and the store.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use proxima_cache::{CacheRecord, CacheStore, MemoryStore};
use proxima_http::{Request, Response};

use crate::error::ForwardError;
use crate::forward::Origin;

/// Answers with queued results, in order, and records every request.
#[derive(Default)]
pub(crate) struct ScriptedOrigin {
    replies: Mutex<VecDeque<Result<Response, ForwardError>>>,
    seen: Mutex<Vec<Request>>,
}

impl ScriptedOrigin {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, res: Response) -> Self {
        self.replies.lock().unwrap().push_back(Ok(res));
        self
    }

    pub(crate) fn fail(self, err: ForwardError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Origin for ScriptedOrigin {
    async fn forward(&self, req: Request) -> Result<Response, ForwardError> {
        self.seen.lock().unwrap().push(req);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("origin called more often than scripted"))
    }
}

/// `MemoryStore` that counts every call.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: MemoryStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    exists: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.puts.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
            + self.exists.load(Ordering::SeqCst)
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn get(&self, key: &str) -> Option<CacheRecord> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, record: CacheRecord) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, record).await
    }

    async fn delete(&self, key: &str) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> bool {
        self.exists.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(key).await
    }

    fn backend(&self) -> &'static str {
        "counting"
    }
}

/// 200 with a body and `Last-Modified`, as the forwarding engine hands it over.
pub(crate) fn ok_with(last_modified: &str, body: &'static [u8]) -> Response {
    Response::new(StatusCode::OK)
        .with_header("Content-Type", "text/plain")
        .with_header("Last-Modified", last_modified)
        .with_body(Bytes::from_static(body))
}

pub(crate) fn status(code: u16) -> Response {
    Response::new(StatusCode::from_u16(code).unwrap())
}

pub(crate) fn get(url: &str) -> Request {
    Request::new("GET", url)
}
