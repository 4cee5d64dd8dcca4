use std::sync::Arc;

use proxima_cache::{CacheEvent, CacheKey, CacheMetrics, CachePolicy};
use proxima_http::responses::internal_error;
use proxima_http::{Request, Response};
use tracing::{debug, info, instrument, warn};

use crate::error::ForwardError;
use crate::forward::Origin;
use crate::validation::CacheValidator;

/// =======================================================
/// REQUEST DISPATCHER
/// =======================================================
///
/// Entry point for one client request:
/// - GET that allows caching → validation engine
/// - anything else → straight to the origin
/// - any forwarding failure that survives → 500
///
/// Every origin body is read exactly once; the same `Bytes` are
/// relayed and, when cacheable, stored.
pub struct Dispatcher {
    origin: Arc<dyn Origin>,
    validator: Option<CacheValidator>,
    metrics: Arc<CacheMetrics>,
}

impl Dispatcher {
    /// `validator: None` runs in pure pass-through mode.
    pub fn new(origin: Arc<dyn Origin>, validator: Option<CacheValidator>, metrics: Arc<CacheMetrics>) -> Self {
        Self {
            origin,
            validator,
            metrics,
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Backend name of the cache store, `"disabled"` in pass-through mode.
    pub fn cache_backend(&self) -> &'static str {
        self.validator
            .as_ref()
            .map_or("disabled", |v| v.store().backend())
    }

    #[instrument(skip(self, req), fields(method = %req.method, uri = %req.target))]
    pub async fn dispatch(&self, req: Request) -> Response {
        match self.try_dispatch(req).await {
            Ok(res) => res,
            Err(e) => {
                warn!(target: "proxima::dispatch", error = %e, "Request failed; answering 500");
                internal_error()
            }
        }
    }

    async fn try_dispatch(&self, req: Request) -> Result<Response, ForwardError> {
        let Some(validator) = &self.validator else {
            return self.origin.forward(req).await;
        };

        let lookup_allowed = CachePolicy::can_attempt_lookup(&req);
        let key = if lookup_allowed {
            CacheKey::for_request(&req)
        } else {
            None
        };

        if let Some(key) = &key
            && req.is_method("GET")
        {
            let validated = validator.handle(key, req).await?;
            info!(
                target: "proxima::dispatch",
                url = %key,
                outcome = ?validated.outcome,
                status = validated.response.status.as_u16(),
                "Served through cache"
            );
            return Ok(validated.response);
        }

        self.metrics.record(CacheEvent::Bypass);
        debug!(
            target: "proxima::dispatch",
            lookup_allowed,
            "Bypassing cache"
        );

        let res = self.origin.forward(req.clone()).await?;
        if let Some(key) = &key {
            validator.store_if_cacheable(key, &req, &res).await;
        }
        Ok(res)
    }
}
