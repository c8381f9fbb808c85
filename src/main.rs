use std::sync::Arc;

use anyhow::Context;
use coroserve::middleware::{AccessLogMiddleware, MetricsMiddleware};
use coroserve::registry;
use coroserve::runtime_config::{LogFormat, RuntimeConfig};
use coroserve::server::{AppService, HttpServer};
use coroserve::Dispatcher;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

fn main() -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env();
    init_logging(config.log_format)?;

    may::config().set_stack_size(config.stack_size);

    // A duplicate route is fatal: abort before serving anything.
    let router = Arc::new(registry::build_router().context("route registration failed")?);

    let mut dispatcher = Dispatcher::new();
    #[allow(unsafe_code)]
    // SAFETY: startup, single-threaded, may runtime configured above.
    unsafe {
        registry::register_handlers(&mut dispatcher);
    }
    dispatcher.add_middleware(Arc::new(AccessLogMiddleware));
    dispatcher.add_middleware(Arc::new(MetricsMiddleware::new()));

    let service = AppService::new(router, Arc::new(dispatcher));
    let handle = HttpServer(service)
        .start(&config.addr)
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(addr = %config.addr, stack_size = config.stack_size, "coroserve listening");

    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server coroutine panicked"))?;
    Ok(())
}
