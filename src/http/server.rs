//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap any axum `Router` in the instrumentation stack (`instrument`)
//! - Serve the built-in endpoints (root, health, version, echo-id)
//! - Bind to a listener and shut down gracefully
//!
//! # Layer order (outermost first)
//! ```text
//! RequestIdLayer → ServiceInfoLayer → CatchPanicLayer → version Extension
//!     → access log → TimeoutLayer → handlers
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::FromRef,
    http::header::InvalidHeaderValue,
    middleware,
    routing::get,
    Extension, Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer};

use crate::config::ServiceConfig;
use crate::http::metadata::{version_layer, ServiceInfoLayer, VersionTag};
use crate::http::middleware::access_log::{access_log_middleware, AccessLogState};
use crate::http::request::RequestIdLayer;
use crate::lifecycle::{signals, ShutdownSignal};
use crate::observability::{AccessLogFormatter, ExclusionList, RequestLogger, SharedSink};

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid service metadata header: {0}")]
    InvalidServiceHeader(#[from] InvalidHeaderValue),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub sink: SharedSink,
}

impl FromRef<AppState> for SharedSink {
    fn from_ref(state: &AppState) -> Self {
        state.sink.clone()
    }
}

/// Apply the full instrumentation stack to `router`.
#[allow(deprecated)]
pub fn instrument(router: Router, config: &ServiceConfig, sink: SharedSink) -> Result<Router, ServerError> {
    let excludes = ExclusionList::new(config.logging.exclude.iter().cloned());
    let formatter = AccessLogFormatter::new(sink, excludes);
    let access_log = AccessLogState::new(formatter, config.logging.panic_policy);
    let service_info = ServiceInfoLayer::new(&config.service.name, &config.service.version)?;

    Ok(router
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(middleware::from_fn_with_state(
            access_log,
            access_log_middleware::<AccessLogFormatter>,
        ))
        .layer(version_layer(config.service.api_version.clone()))
        .layer(CatchPanicLayer::new())
        .layer(service_info)
        .layer(RequestIdLayer))
}

/// HTTP server exposing the built-in endpoints.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and log sink.
    pub fn new(config: ServiceConfig, sink: SharedSink) -> Result<Self, ServerError> {
        let state = AppState { sink: sink.clone() };
        let routes = Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route("/version", get(version))
            .route("/echo-id", get(echo_id))
            .with_state(state);

        let router = instrument(routes, &config, sink)?;
        Ok(Self { router, config })
    }

    /// The fully layered router, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Serve until a termination signal or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            version = %self.config.service.version,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = signals::terminate() => {},
                    _ = shutdown.recv() => {},
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn root(log: RequestLogger) -> &'static str {
    log.debug("Serving root");
    "toggly-middleware"
}

async fn health() -> &'static str {
    "ok"
}

async fn version(Extension(tag): Extension<VersionTag>) -> String {
    tag.to_string()
}

async fn echo_id(log: RequestLogger) -> String {
    let id = log.request_id().map(ToString::to_string).unwrap_or_default();
    log.info(format_args!("Echoing request id {}", id));
    id
}
