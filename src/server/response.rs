use may_minihttp::Response;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::codec;
use crate::dispatcher::{HandlerResponse, ResponseBody};

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Intern a `name: value` header line as a `&'static str`.
///
/// may_minihttp only accepts `&'static str` headers, so dynamic header
/// lines must be leaked. Interning leaks each distinct line exactly once;
/// repeated requests carrying the same headers reuse the cached line, so
/// memory growth is bounded by the number of distinct header lines the
/// application produces.
fn interned_header_line(name: &str, value: &str) -> &'static str {
    static CACHE: OnceLock<Mutex<HashMap<String, &'static str>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let line = format!("{name}: {value}");
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(interned) = cache.get(&line) {
        return interned;
    }
    let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
    cache.insert(line, leaked);
    leaked
}

/// Write a [`HandlerResponse`] to the wire.
///
/// `ResponseBody::Json` is serialized by the codec (a JSON string body
/// keeps its quotes); `ResponseBody::Text` goes out verbatim as
/// `text/plain`. A content type set by the handler or middleware wins over
/// the default.
pub fn write_handler_response(res: &mut Response, hr: &HandlerResponse) {
    res.status_code(hr.status as usize, status_reason(hr.status));

    let explicit_content_type = hr.get_header("content-type").is_some();
    for (name, value) in &hr.headers {
        res.header(interned_header_line(name, value));
    }

    match &hr.body {
        ResponseBody::Json(value) => {
            if !explicit_content_type {
                res.header("Content-Type: application/json");
            }
            res.body_vec(codec::encode(value));
        }
        ResponseBody::Text(text) => {
            if !explicit_content_type {
                res.header("Content-Type: text/plain");
            }
            res.body_vec(text.clone().into_bytes());
        }
    }
}

/// Write a service-level JSON error, bypassing the dispatcher.
pub fn write_json_error(res: &mut Response, status: u16, body: Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_status_reasons() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(400), "Bad Request");
        assert_eq!(status_reason(403), "Forbidden");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(503), "Service Unavailable");
    }

    #[test]
    fn unmapped_status_has_no_reason_phrase() {
        assert_eq!(status_reason(299), "");
    }

    #[test]
    fn repeated_header_lines_share_one_interned_allocation() {
        let first = interned_header_line("x-tagged", "yes");
        let second = interned_header_line("x-tagged", "yes");
        assert!(std::ptr::eq(first, second));
        assert_eq!(first, "x-tagged: yes");

        let other = interned_header_line("x-tagged", "no");
        assert!(!std::ptr::eq(first, other));
    }
}
