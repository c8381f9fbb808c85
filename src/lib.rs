//! # coroserve
//!
//! **coroserve** is a minimal HTTP application server core built on the `may`
//! coroutine runtime and `may_minihttp`. It provides the three pieces every
//! application server needs and deliberately nothing more:
//!
//! - **[`router`]** - an immutable route table with `{name}` path parameters,
//!   built once at startup and resolved per request
//! - **[`middleware`]** - an ordered before/after chain composed around
//!   handler execution (access logging, metrics)
//! - **[`dispatcher`]** - coroutine-based handler dispatch with panic
//!   recovery and error-to-response translation
//! - **[`codec`]** - strict JSON decoding and total encoding of handler
//!   payloads
//! - **[`server`]** - the thin adapter between `may_minihttp` and the
//!   dispatcher
//! - **[`handlers`]** - the demonstration endpoints wired up by
//!   [`registry`]
//!
//! ## Request flow
//!
//! ```text
//! raw request -> server::AppService -> Router::resolve
//!             -> Dispatcher::dispatch -> middleware before*
//!             -> handler coroutine    -> middleware after* (reverse)
//!             -> server response writer
//! ```
//!
//! Route resolution failures still travel through the middleware chain so the
//! access log observes 404s. Handler failures (`DecodeError`,
//! `ValidationError`) are translated to 400 responses inside the dispatch
//! boundary and never escape a single request. The only fatal error is a
//! duplicate route registration at startup.

pub mod codec;
pub mod dispatcher;
pub mod handlers;
pub mod ids;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use codec::DecodeError;
pub use dispatcher::{
    Dispatcher, Handler, HandlerError, HandlerRequest, HandlerResponse, HeaderVec, ResponseBody,
    ValidationError,
};
pub use middleware::Middleware;
pub use router::{
    DuplicateRouteError, NotFoundError, ParamVec, RouteMatch, Router, RouterBuilder,
};
pub use runtime_config::RuntimeConfig;
