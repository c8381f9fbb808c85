//! Coroutine-based request dispatch.
//!
//! Each registered handler owns a `may` coroutine that serves requests from
//! a channel; dispatch sends a [`HandlerRequest`] and waits on a per-request
//! reply channel. The dispatcher is the recovery boundary for everything
//! that can go wrong inside one request: decode and validation failures
//! become 400 responses, handler panics become 500, a dead handler channel
//! becomes 503. Nothing propagates past a single request.

use crate::codec::DecodeError;
use crate::ids::RequestId;
use crate::middleware::{chain, Middleware};
use crate::router::{ParamVec, RouteMatch};
use crate::runtime_config;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Maximum inline headers before heap allocation.
/// Most requests carry well under 16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names repeat across requests and are shared as `Arc<str>`;
/// values are per-request strings.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request data passed to a handler coroutine.
///
/// Immutable once constructed; owned by the dispatch of a single request
/// and dropped when that request completes.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request id for log correlation.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// The actual request path.
    pub path: String,
    /// Name the handler was registered under (empty for the not-found path).
    pub handler_name: String,
    /// Parameters captured from the matched pattern.
    pub path_params: ParamVec,
    /// HTTP headers, lowercase names.
    pub headers: HeaderVec,
    /// Raw request body. Only the codec interprets these bytes.
    pub body: Option<Vec<u8>>,
    /// Channel for sending the response back to the dispatcher.
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerRequest {
    /// Get a path parameter by name. Last write wins when duplicate names
    /// exist at different path depths.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The body of a [`HandlerResponse`]: either a JSON value serialized by the
/// codec, or raw text written to the wire as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

/// Response data produced by a handler or middleware.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lowercase names.
    pub headers: HeaderVec,
    /// Response payload.
    pub body: ResponseBody,
}

impl HandlerResponse {
    /// A JSON response with the default content type.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: ResponseBody::Json(body),
        }
    }

    /// A raw text response.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: ResponseBody::Text(body.into()),
        }
    }

    /// A structured error response: `{"error": "<message>"}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Well-formed payload carrying a semantically invalid value, e.g. a
/// non-integer user id.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything a handler can fail with. Recovered inside the handler
/// coroutine and translated to a 400 response.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl HandlerError {
    fn into_response(self) -> HandlerResponse {
        HandlerResponse::error(400, &self.to_string())
    }
}

/// A request handler: one `invoke` per request, run inside the handler's
/// coroutine. Implemented for plain functions.
pub trait Handler: Send + 'static {
    fn invoke(&self, req: &HandlerRequest) -> Result<HandlerResponse, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&HandlerRequest) -> Result<HandlerResponse, HandlerError> + Send + 'static,
{
    fn invoke(&self, req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
        (self)(req)
    }
}

/// Type alias for a channel sender that feeds a handler coroutine.
pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// What `catch_unwind` around a handler invocation yields.
type HandlerOutcome = std::thread::Result<Result<HandlerResponse, HandlerError>>;

/// Translate a handler invocation outcome into the response sent back to
/// the dispatcher: success passes through, a handler error becomes a 400,
/// a panic becomes a 500. Every arm produces a response; nothing escapes
/// the handler coroutine.
fn outcome_to_response(
    outcome: HandlerOutcome,
    request_id: RequestId,
    handler_name: &str,
) -> HandlerResponse {
    match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!(
                request_id = %request_id,
                handler_name = %handler_name,
                error = %err,
                "handler rejected request"
            );
            err.into_response()
        }
        Err(panic) => {
            error!(
                request_id = %request_id,
                handler_name = %handler_name,
                panic = ?panic,
                "handler panicked"
            );
            HandlerResponse::error(500, "internal server error")
        }
    }
}

/// Dispatcher that routes resolved requests to registered handler
/// coroutines and applies the middleware chain around them.
///
/// Built once at startup; like the route table it is shared read-only
/// afterwards.
#[derive(Clone, Default)]
pub struct Dispatcher {
    /// Map of handler names to their channel senders.
    handlers: HashMap<String, HandlerSender>,
    /// Ordered list of middleware steps applied around every request.
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    /// Create an empty dispatcher. Handlers are added with
    /// [`register_handler`](Self::register_handler).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware step. Steps run in insertion order on the way in
    /// and reverse order on the way out.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// True if a handler is registered under `name`.
    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Register a handler under `name`, spawning its coroutine.
    ///
    /// The coroutine serves requests from its channel until the dispatcher
    /// is dropped. Panics inside the handler are caught and turned into 500
    /// responses so one failing request cannot take the server down.
    /// Registering the same name twice replaces the old handler; its
    /// channel closes and the old coroutine exits.
    ///
    /// # Safety
    ///
    /// `may::coroutine::Builder::spawn` is unsafe; the caller must ensure
    /// the may runtime is initialized (set the stack size before spawning)
    /// and must only register handlers during startup.
    #[allow(unsafe_code)]
    pub unsafe fn register_handler<H: Handler>(&mut self, name: &str, handler: H) {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let name = name.to_string();

        if self.handlers.remove(&name).is_some() {
            warn!(handler_name = %name, "replaced existing handler, old coroutine will exit");
        }

        let stack_size = runtime_config::stack_size_from_env();
        let coroutine_name = name.clone();
        let spawn_result = coroutine::Builder::new()
            .stack_size(stack_size)
            .spawn(move || {
                debug!(handler_name = %coroutine_name, stack_size, "handler coroutine start");
                for req in rx.iter() {
                    let reply_tx = req.reply_tx.clone();
                    let request_id = req.request_id;

                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        handler.invoke(&req)
                    }));
                    let response = outcome_to_response(outcome, request_id, &coroutine_name);

                    if reply_tx.send(response).is_err() {
                        // Client side of the dispatch is gone; drop the
                        // response without escalating.
                        debug!(
                            request_id = %request_id,
                            handler_name = %coroutine_name,
                            "reply channel closed, response abandoned"
                        );
                    }
                }
            });

        match spawn_result {
            Ok(_) => {
                debug!(handler_name = %name, "handler registered");
                self.handlers.insert(name, tx);
            }
            Err(e) => {
                error!(handler_name = %name, error = %e, "failed to spawn handler coroutine");
            }
        }
    }

    /// Dispatch a resolved request through the middleware chain to its
    /// handler and wait for the response.
    ///
    /// Returns `None` only when no handler is registered under the resolved
    /// name; the service layer translates that into a 500.
    #[must_use]
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        body: Option<Vec<u8>>,
        headers: HeaderVec,
    ) -> Option<HandlerResponse> {
        let tx = match self.handlers.get(&route_match.handler_name) {
            Some(tx) => tx.clone(),
            None => {
                error!(
                    handler_name = %route_match.handler_name,
                    available_handlers = self.handlers.len(),
                    "handler not found"
                );
                return None;
            }
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id: RequestId::new(),
            method: route_match.method,
            path: route_match.path,
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            headers,
            body,
            reply_tx,
        };

        let response = chain::run(&self.middlewares, &request, move |req| {
            if tx.send(req.clone()).is_err() {
                error!(
                    request_id = %req.request_id,
                    handler_name = %req.handler_name,
                    "failed to send request to handler"
                );
                return HandlerResponse::error(503, "handler unavailable");
            }
            match reply_rx.recv() {
                Ok(response) => response,
                Err(_) => {
                    error!(
                        request_id = %req.request_id,
                        handler_name = %req.handler_name,
                        "handler channel closed, handler may have crashed"
                    );
                    HandlerResponse::error(503, "handler not responding")
                }
            }
        });
        Some(response)
    }

    /// Run the middleware chain around a synthesized 404 response, so that
    /// access logging observes unmatched routes too.
    #[must_use]
    pub fn dispatch_not_found(
        &self,
        method: Method,
        path: &str,
        headers: HeaderVec,
    ) -> HandlerResponse {
        let (reply_tx, _reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            handler_name: String::new(),
            path_params: ParamVec::new(),
            headers,
            body: None,
            reply_tx,
        };
        chain::run(&self.middlewares, &request, |_req| {
            HandlerResponse::error(404, "not found")
        })
    }

    /// Ordered middleware steps, exposed for the service layer and tests.
    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_body(response: &HandlerResponse) -> &Value {
        match &response.body {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => panic!("expected JSON body, got text: {text}"),
        }
    }

    #[test]
    fn successful_outcome_passes_through() {
        let outcome: HandlerOutcome = Ok(Ok(HandlerResponse::text(200, "ok")));
        let response = outcome_to_response(outcome, RequestId::new(), "echo");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, ResponseBody::Text("ok".to_string()));
    }

    #[test]
    fn handler_error_outcome_becomes_400() {
        let outcome: HandlerOutcome = Ok(Err(ValidationError::new("invalid id").into()));
        let response = outcome_to_response(outcome, RequestId::new(), "fetch_user_by_id");
        assert_eq!(response.status, 400);
        assert_eq!(json_body(&response)["error"], "invalid id");
    }

    #[test]
    fn panic_outcome_becomes_500() {
        let outcome = std::panic::catch_unwind(|| -> Result<HandlerResponse, HandlerError> {
            panic!("boom")
        });
        assert!(outcome.is_err());
        let response = outcome_to_response(outcome, RequestId::new(), "boom");
        assert_eq!(response.status, 500);
        assert_eq!(json_body(&response)["error"], "internal server error");
    }
}
