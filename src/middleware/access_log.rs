use std::time::Duration;

use tracing::{debug, info};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Access logging: observes every request, including 404s and
/// short-circuited ones, and never touches request or response content.
///
/// `before` notes the arrival; `after` emits the access line with the final
/// status and the time spent in the handler.
pub struct AccessLogMiddleware;

impl Middleware for AccessLogMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            "request received"
        );
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            status = res.status,
            latency_ms = latency.as_millis() as u64,
            "request completed"
        );
    }
}
