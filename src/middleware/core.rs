use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// One step of the middleware chain.
///
/// `before` runs in registration order ahead of the handler; returning
/// `Some(response)` short-circuits the request, skipping later `before`
/// phases and the handler. `after` runs in reverse registration order and
/// may transform the response; it also runs for short-circuited requests,
/// but only on the steps whose `before` already ran. `latency` is the time
/// spent in the terminal handler (zero when short-circuited).
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}
