//! Startup wiring: the route table and the handler registrations for the
//! demonstration endpoints. This is the only place routes and handlers are
//! added; both structures are frozen afterwards.

use http::Method;

use crate::dispatcher::Dispatcher;
use crate::handlers;
use crate::router::{DuplicateRouteError, Router};

/// Build the route table for the demonstration endpoints.
///
/// # Errors
///
/// `DuplicateRouteError` if the same `(method, pattern)` pair is wired
/// twice; fatal at startup.
pub fn build_router() -> Result<Router, DuplicateRouteError> {
    Ok(Router::builder()
        .route(Method::GET, "/", "hello")?
        .route(Method::GET, "/users", "fetch_person")?
        .route(Method::POST, "/users", "create_person")?
        .route(Method::GET, "/users/{id}", "fetch_user_by_id")?
        .build())
}

/// Register all demonstration handlers.
///
/// # Safety
///
/// Spawns may coroutines; the caller must ensure the may runtime is
/// initialized and only call this during startup.
#[allow(unsafe_code)]
pub unsafe fn register_handlers(dispatcher: &mut Dispatcher) {
    dispatcher.register_handler("hello", handlers::hello::handle);
    dispatcher.register_handler("fetch_person", handlers::fetch_person::handle);
    dispatcher.register_handler("create_person", handlers::create_person::handle);
    dispatcher.register_handler("fetch_user_by_id", handlers::fetch_user_by_id::handle);
}
