//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use toggly_middleware::config::ServiceConfig;
use toggly_middleware::observability::{MemorySink, SharedSink};
use toggly_middleware::{instrument, HttpServer, Shutdown};

/// Config used by every test server.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.service.name = "shield".to_string();
    config.service.version = "1.0.0".to_string();
    config.service.api_version = "v1.0".to_string();
    config
}

/// Serve `routes` wrapped in the instrumentation stack on an ephemeral port.
pub async fn spawn_instrumented(routes: Router, sink: &MemorySink) -> (SocketAddr, Shutdown) {
    let shared: SharedSink = Arc::new(sink.clone());
    let app = instrument(routes, &test_config(), shared).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(signal.recv())
            .await;
    });

    (addr, shutdown)
}

/// Run the built-in `HttpServer` on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_server(sink: &MemorySink) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(test_config(), Arc::new(sink.clone())).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    (addr, shutdown)
}

/// HTTP client without pooling or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
