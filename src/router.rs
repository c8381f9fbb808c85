//! Route table: method + path pattern registration and per-request
//! resolution.
//!
//! Patterns are sequences of literal segments and `{name}` parameter
//! segments. Matching is segment-by-segment: lengths must match exactly,
//! literals compare by string equality, parameters match any single
//! non-empty segment and capture its value. There is no prefix matching and
//! no wildcard segment.
//!
//! The table is assembled through [`RouterBuilder`] at startup and frozen
//! into an immutable [`Router`]. Nothing mutates it afterwards, so it is
//! shared between connections as a plain `Arc` without locking.

use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Maximum number of path parameters before heap allocation.
/// Most REST-style paths have well under 8 parameters.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Parameter names come from the static route table and are shared as
/// `Arc<str>` (O(1) clone); values are per-request strings from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// One segment of a registered path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Must equal the incoming path segment exactly.
    Literal(String),
    /// Matches any single non-empty segment and captures it under the name.
    Param(Arc<str>),
}

impl Segment {
    fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

/// A registered route: immutable after [`RouterBuilder::build`].
#[derive(Debug, Clone)]
struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    handler_name: String,
}

/// Startup-time registration conflict: the same `(method, pattern)` pair was
/// registered twice. Fatal; the server must not start.
#[derive(Debug, Error)]
#[error("duplicate route: {method} {pattern}")]
pub struct DuplicateRouteError {
    pub method: Method,
    pub pattern: String,
}

/// No registered route matches the incoming `(method, path)` pair.
#[derive(Debug, Error)]
#[error("no route matches {method} {path}")]
pub struct NotFoundError {
    pub method: Method,
    pub path: String,
}

/// Result of successfully resolving a request path against the route table.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// HTTP method of the incoming request.
    pub method: Method,
    /// The actual request path (not the pattern).
    pub path: String,
    /// The pattern that matched, e.g. `/users/{id}`.
    pub pattern: String,
    /// Opaque handler reference registered for the route.
    pub handler_name: String,
    /// Parameters captured from the path, e.g. `{id}` -> `"42"`.
    pub path_params: ParamVec,
}

/// Immutable route table. Build one with [`Router::builder`].
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Start building a route table.
    pub fn builder() -> RouterBuilder {
        RouterBuilder { routes: Vec::new() }
    }

    /// Resolve an incoming `(method, path)` pair to a handler plus captured
    /// path parameters.
    ///
    /// When several patterns match the same path, literal segments take
    /// precedence over parameter segments at the same position, so
    /// `/users/active` wins over `/users/{id}` for the path `/users/active`.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch, NotFoundError> {
        debug!(method = %method, path = %path, "route match attempt");
        let segments = split_path(path);

        let mut best: Option<(&Route, ParamVec)> = None;
        for route in &self.routes {
            if route.method != *method || route.segments.len() != segments.len() {
                continue;
            }
            let Some(params) = match_segments(&route.segments, &segments) else {
                continue;
            };
            let replace = match &best {
                Some((current, _)) => more_specific(&route.segments, &current.segments),
                None => true,
            };
            if replace {
                best = Some((route, params));
            }
        }

        match best {
            Some((route, path_params)) => {
                debug!(
                    method = %method,
                    path = %path,
                    pattern = %route.pattern,
                    handler_name = %route.handler_name,
                    path_params = ?path_params,
                    "route matched"
                );
                Ok(RouteMatch {
                    method: method.clone(),
                    path: path.to_string(),
                    pattern: route.pattern.clone(),
                    handler_name: route.handler_name.clone(),
                    path_params,
                })
            }
            None => {
                warn!(method = %method, path = %path, "no route matched");
                Err(NotFoundError {
                    method: method.clone(),
                    path: path.to_string(),
                })
            }
        }
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Builder for the route table. The only place routes can be added;
/// [`build`](RouterBuilder::build) freezes the result.
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    /// Register a route.
    ///
    /// Fails with [`DuplicateRouteError`] if the same `(method, pattern)`
    /// pair is already registered; the table is left unchanged in that case.
    pub fn route(
        mut self,
        method: Method,
        pattern: &str,
        handler_name: &str,
    ) -> Result<Self, DuplicateRouteError> {
        let segments = parse_pattern(pattern);
        if self
            .routes
            .iter()
            .any(|r| r.method == method && r.segments == segments)
        {
            return Err(DuplicateRouteError {
                method,
                pattern: pattern.to_string(),
            });
        }
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            segments,
            handler_name: handler_name.to_string(),
        });
        Ok(self)
    }

    /// Freeze the accumulated routes into an immutable [`Router`].
    pub fn build(self) -> Router {
        let routes_summary: Vec<String> = self
            .routes
            .iter()
            .take(10)
            .map(|r| format!("{} {} -> {}", r.method, r.pattern, r.handler_name))
            .collect();
        info!(
            routes_count = self.routes.len(),
            routes_summary = ?routes_summary,
            "routing table loaded"
        );
        Router {
            routes: self.routes,
        }
    }
}

/// Split a path into its raw segments. A bare `/` yields one empty segment,
/// which only another bare `/` pattern can match; trailing slashes are
/// therefore significant.
fn split_path(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    split_path(pattern)
        .into_iter()
        .map(|seg| {
            match seg
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                Some(name) => Segment::Param(Arc::from(name)),
                None => Segment::Literal(seg.to_string()),
            }
        })
        .collect()
}

/// Segment-by-segment comparison; returns captured parameters on a match.
fn match_segments(pattern: &[Segment], path: &[&str]) -> Option<ParamVec> {
    let mut params = ParamVec::new();
    for (segment, value) in pattern.iter().zip(path) {
        match segment {
            Segment::Literal(lit) => {
                if lit != value {
                    return None;
                }
            }
            Segment::Param(name) => {
                if value.is_empty() {
                    return None;
                }
                params.push((Arc::clone(name), (*value).to_string()));
            }
        }
    }
    Some(params)
}

/// True if `a` beats `b`: at the first position where the segment kinds
/// differ, a literal outranks a parameter.
fn more_specific(a: &[Segment], b: &[Segment]) -> bool {
    for (sa, sb) in a.iter().zip(b) {
        match (sa.is_literal(), sb.is_literal()) {
            (true, false) => return true,
            (false, true) => return false,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_param_segments() {
        let segments = parse_pattern("/users/{id}/posts");
        assert_eq!(segments.len(), 3);
        assert!(segments[0].is_literal());
        assert!(!segments[1].is_literal());
        assert!(segments[2].is_literal());
    }

    #[test]
    fn root_pattern_is_a_single_empty_literal() {
        assert_eq!(parse_pattern("/"), vec![Segment::Literal(String::new())]);
    }

    #[test]
    fn trailing_slash_does_not_match() {
        let router = Router::builder()
            .route(Method::GET, "/users", "list")
            .unwrap()
            .build();
        assert!(router.resolve(&Method::GET, "/users").is_ok());
        assert!(router.resolve(&Method::GET, "/users/").is_err());
    }

    #[test]
    fn param_does_not_match_empty_segment() {
        let router = Router::builder()
            .route(Method::GET, "/users/{id}", "get_user")
            .unwrap()
            .build();
        assert!(router.resolve(&Method::GET, "/users//").is_err());
        assert!(router.resolve(&Method::GET, "/users/").is_err());
    }
}
