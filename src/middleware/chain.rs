//! The chain runner: applies an ordered list of middleware steps around a
//! terminal handler.
//!
//! Kept separate from the dispatcher so the wrapping order is auditable and
//! testable in isolation. The ordering contract: for steps `A` then `B`,
//! a non-short-circuited request runs
//! `A.before, B.before, handler, B.after, A.after` - the first-registered
//! step is the outermost wrapper.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dispatcher::{HandlerRequest, HandlerResponse};

use super::Middleware;

/// Run `terminal` wrapped in `steps`.
///
/// The first `before` returning `Some` short-circuits: later `before`
/// phases and the terminal handler are skipped, but the `after` phases of
/// every step whose `before` ran (the short-circuiting step included) still
/// execute, in reverse order. Short-circuited requests report zero latency.
pub fn run<F>(
    steps: &[Arc<dyn Middleware>],
    req: &HandlerRequest,
    terminal: F,
) -> HandlerResponse
where
    F: FnOnce(&HandlerRequest) -> HandlerResponse,
{
    let mut ran = 0;
    let mut short_circuit = None;
    for step in steps {
        ran += 1;
        if let Some(response) = step.before(req) {
            short_circuit = Some(response);
            break;
        }
    }

    let (mut response, latency) = match short_circuit {
        Some(response) => (response, Duration::ZERO),
        None => {
            let start = Instant::now();
            let response = terminal(req);
            (response, start.elapsed())
        }
    };

    for step in steps[..ran].iter().rev() {
        step.after(req, &mut response, latency);
    }

    response
}
