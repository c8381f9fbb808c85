pub mod chain;
mod core;
mod access_log;
mod metrics;

pub use access_log::AccessLogMiddleware;
pub use core::Middleware;
pub use metrics::MetricsMiddleware;
