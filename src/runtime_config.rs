//! Environment-based runtime configuration.
//!
//! - `COROSERVE_ADDR` - bind address (default `127.0.0.1:3000`)
//! - `COROSERVE_STACK_SIZE` - coroutine stack size in bytes, decimal or
//!   hex with an `0x` prefix (default `0x4000`, 16 KB)
//! - `COROSERVE_LOG_FORMAT` - `json` (default) or `pretty`

use std::env;

/// Default coroutine stack size: 16 KB.
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Default bind address, matching the demo server.
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Log output format for the fmt subscriber layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Runtime configuration loaded once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Address the server binds to.
    pub addr: String,
    /// Stack size for handler coroutines in bytes.
    pub stack_size: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            addr: env::var("COROSERVE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            stack_size: stack_size_from_env(),
            log_format: env::var("COROSERVE_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(LogFormat::Json),
        }
    }
}

/// Read the coroutine stack size from `COROSERVE_STACK_SIZE`, accepting
/// decimal or `0x`-prefixed hex. Falls back to [`DEFAULT_STACK_SIZE`].
#[must_use]
pub fn stack_size_from_env() -> usize {
    env::var("COROSERVE_STACK_SIZE")
        .ok()
        .and_then(|v| parse_stack_size(&v))
        .unwrap_or(DEFAULT_STACK_SIZE)
}

fn parse_stack_size(value: &str) -> Option<usize> {
    if let Some(hex) = value.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
