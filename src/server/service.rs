use super::request::parse_request;
use super::response::{write_handler_response, write_json_error};
use crate::dispatcher::{Dispatcher, HandlerResponse};
use crate::router::Router;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, error};

/// The glue between may_minihttp and this crate: parse, resolve, dispatch,
/// write.
///
/// Router and dispatcher are built once at startup and shared read-only as
/// plain `Arc`s; no per-request locking exists because nothing mutates them
/// after startup.
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppService {
    #[must_use]
    pub fn new(router: Arc<Router>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { router, dispatcher }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);

        let method: Method = match parsed.method.parse() {
            Ok(method) => method,
            Err(_) => {
                write_json_error(res, 400, json!({ "error": "invalid method" }));
                return Ok(());
            }
        };

        let response: HandlerResponse = match self.router.resolve(&method, &parsed.path) {
            Ok(route_match) => {
                match self
                    .dispatcher
                    .dispatch(route_match, parsed.body, parsed.headers)
                {
                    Some(response) => response,
                    None => {
                        error!(
                            method = %method,
                            path = %parsed.path,
                            "no handler registered for resolved route"
                        );
                        HandlerResponse::error(500, "handler not registered")
                    }
                }
            }
            Err(err) => {
                // The not-found path still runs the middleware chain so the
                // access log observes it.
                debug!(error = %err, "route resolution failed");
                self.dispatcher
                    .dispatch_not_found(method, &parsed.path, parsed.headers)
            }
        };

        write_handler_response(res, &response);
        Ok(())
    }
}
