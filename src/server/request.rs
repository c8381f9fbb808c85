use crate::dispatcher::HeaderVec;
use may_minihttp::Request;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Parsed HTTP request data used by `AppService`.
///
/// The body stays raw bytes; interpreting it is the codec's job inside the
/// handler.
#[derive(Debug)]
pub struct ParsedRequest {
    /// HTTP method as received (parsed into `http::Method` by the service).
    pub method: String,
    /// Request path with any query string stripped.
    pub path: String,
    /// HTTP headers, lowercase names.
    pub headers: HeaderVec,
    /// Raw request body, if any bytes were sent.
    pub body: Option<Vec<u8>>,
}

/// Extract method, path, headers and body from a `may_minihttp::Request`.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let mut headers = HeaderVec::new();
    for h in req.headers().iter() {
        headers.push((
            Arc::from(h.name.to_ascii_lowercase().as_str()),
            String::from_utf8_lossy(h.value).to_string(),
        ));
    }

    let mut buf = Vec::new();
    let body = match req.body().read_to_end(&mut buf) {
        Ok(n) if n > 0 => Some(buf),
        _ => None,
    };

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        body_bytes = body.as_ref().map_or(0, Vec::len),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        body,
    }
}
