//! HTTP server facade for Bookshelf with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::signal;

use bookshelf_kernel::{
    settings::{Environment, Settings},
    ModuleRegistry,
};

pub mod error;
pub mod router;

pub use error::AppError;
use router::RouterBuilder;

/// Set by the Lambda runtime inside a function's execution environment.
pub const LAMBDA_RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// How the router receives requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hosting {
    /// Own TCP listener.
    Server,
    /// API Gateway HTTP API events delivered by the Lambda runtime.
    Lambda,
}

impl Hosting {
    pub fn detect() -> Self {
        Self::from_runtime_api(std::env::var(LAMBDA_RUNTIME_API_ENV).ok().as_deref())
    }

    fn from_runtime_api(runtime_api: Option<&str>) -> Self {
        match runtime_api {
            Some(api) if !api.is_empty() => Hosting::Lambda,
            _ => Hosting::Server,
        }
    }
}

/// Serve the registry's routes under whichever host the process runs in.
pub async fn serve(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    match Hosting::detect() {
        Hosting::Server => start_server(registry, settings).await,
        Hosting::Lambda => start_lambda(registry, settings).await,
    }
}

/// Hand the router to the Lambda runtime. Returns only if the runtime fails.
pub async fn start_lambda(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    let app = build_router(registry, settings);

    tracing::info!("serving HTTP API events through the Lambda runtime");
    lambda_http::run(app)
        .await
        .map_err(|err| anyhow::anyhow!("Lambda runtime failed: {}", err))
}

/// Start the HTTP server with the given module registry.
///
/// Returns once a shutdown signal has been received and in-flight requests
/// have drained.
pub async fn start_server(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    let app = build_router(registry, settings);

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let mut router_builder = RouterBuilder::new()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .with_body_limit(settings.server.max_upload_bytes)
        .route("/healthz", get(health_check));

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes());
    }

    // API documentation is a development aid only.
    if settings.environment == Environment::Local {
        router_builder = router_builder.with_openapi(registry);
    }

    router_builder.build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
