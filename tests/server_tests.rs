//! End-to-end tests over a real socket: raw HTTP requests against a running
//! server, asserting status codes, content types, and exact body shapes.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use coroserve::middleware::{AccessLogMiddleware, MetricsMiddleware};
use coroserve::registry;
use coroserve::server::{AppService, HttpServer, ServerHandle};
use coroserve::Dispatcher;
use serde_json::Value;

/// Grab an ephemeral port the OS considers free right now.
fn ephemeral_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr").to_string();
    drop(listener);
    addr
}

fn start_server() -> (String, ServerHandle) {
    may::config().set_stack_size(0x8000);

    let router = Arc::new(registry::build_router().expect("routes"));
    let mut dispatcher = Dispatcher::new();
    #[allow(unsafe_code)]
    unsafe {
        registry::register_handlers(&mut dispatcher);
    }
    dispatcher.add_middleware(Arc::new(AccessLogMiddleware));
    dispatcher.add_middleware(Arc::new(MetricsMiddleware::new()));

    let service = AppService::new(router, Arc::new(dispatcher));
    let addr = ephemeral_addr();
    let handle = HttpServer(service).start(&addr).expect("start server");
    handle.wait_ready().expect("server ready");
    (addr, handle)
}

/// Send one raw HTTP request and read the full response. The connection is
/// keep-alive, so reading stops on a short read timeout.
fn send_request(addr: &str, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .expect("set timeout");
    stream.write_all(raw.as_bytes()).expect("write request");

    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                response.extend_from_slice(&buf[..n]);
                if has_full_body(&response) {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&response).into_owned()
}

/// True once the buffered response contains all the bytes Content-Length
/// promises (or the headers declare no body).
fn has_full_body(response: &[u8]) -> bool {
    let text = String::from_utf8_lossy(response);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    body.len() >= content_length
}

fn get(addr: &str, path: &str) -> String {
    send_request(
        addr,
        &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
    )
}

fn post_json(addr: &str, path: &str, body: &str) -> String {
    send_request(
        addr,
        &format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ),
    )
}

fn status_of(response: &str) -> u16 {
    response
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("no status line in: {response}"))
}

fn body_of(response: &str) -> &str {
    response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or_else(|| panic!("no body separator in: {response}"))
}

#[test]
fn serves_hello_world_at_root() {
    let (addr, handle) = start_server();
    let response = get(&addr, "/");
    assert_eq!(status_of(&response), 200);
    assert_eq!(body_of(&response), "Hello World!");
    assert!(response.contains("Content-Type: text/plain"));
    handle.stop();
}

#[test]
fn serves_person_as_json() {
    let (addr, handle) = start_server();
    let response = get(&addr, "/users");
    assert_eq!(status_of(&response), 200);
    assert!(response.contains("Content-Type: application/json"));
    let body: Value = serde_json::from_str(body_of(&response)).expect("json body");
    assert_eq!(body["name"], "Good!");
    assert_eq!(body["age"], "21");
    handle.stop();
}

#[test]
fn echoes_posted_name_as_json_string() {
    let (addr, handle) = start_server();
    let response = post_json(&addr, "/users", r#"{"name":"John"}"#);
    assert_eq!(status_of(&response), 200);
    // A JSON string body keeps its quotes on the wire.
    assert_eq!(body_of(&response), "\"Received name: John\"");
    assert!(response.contains("Content-Type: application/json"));
    handle.stop();
}

#[test]
fn rejects_malformed_post_body() {
    let (addr, handle) = start_server();
    let response = post_json(&addr, "/users", "{not json");
    assert_eq!(status_of(&response), 400);
    let body: Value = serde_json::from_str(body_of(&response)).expect("json body");
    assert!(body.get("error").is_some());
    handle.stop();
}

#[test]
fn serves_user_id_as_text() {
    let (addr, handle) = start_server();
    let response = get(&addr, "/users/7");
    assert_eq!(status_of(&response), 200);
    assert_eq!(body_of(&response), "User ID is 7");
    assert!(response.contains("Content-Type: text/plain"));
    handle.stop();
}

#[test]
fn rejects_non_numeric_user_id() {
    let (addr, handle) = start_server();
    let response = get(&addr, "/users/abc");
    assert_eq!(status_of(&response), 400);
    let body: Value = serde_json::from_str(body_of(&response)).expect("json body");
    assert_eq!(body["error"], "invalid id");
    handle.stop();
}

#[test]
fn unmatched_route_is_a_json_404() {
    let (addr, handle) = start_server();
    let response = get(&addr, "/unknown");
    assert_eq!(status_of(&response), 404);
    let body: Value = serde_json::from_str(body_of(&response)).expect("json body");
    assert_eq!(body["error"], "not found");
    handle.stop();
}

#[test]
fn wrong_method_on_known_path_is_404() {
    let (addr, handle) = start_server();
    let response = send_request(
        &addr,
        "DELETE /users HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    assert_eq!(status_of(&response), 404);
    handle.stop();
}

#[test]
fn query_string_is_ignored_for_matching() {
    let (addr, handle) = start_server();
    let response = get(&addr, "/users/7?verbose=1");
    assert_eq!(status_of(&response), 200);
    assert_eq!(body_of(&response), "User ID is 7");
    handle.stop();
}

#[test]
fn keep_alive_serves_sequential_requests() {
    let (addr, handle) = start_server();
    let mut stream = TcpStream::connect(&addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .expect("set timeout");

    for _ in 0..2 {
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .expect("write request");
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).expect("read response");
        let response = String::from_utf8_lossy(&buf[..n]);
        assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
        assert!(response.contains("Hello World!"));
    }
    handle.stop();
}
