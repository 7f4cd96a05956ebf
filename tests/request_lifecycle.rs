//! End-to-end request lifecycle tests over a real socket.

use std::time::Duration;

use axum::{routing::get, Router};
use toggly_middleware::observability::{panic_hook, MemorySink, Severity};

mod common;

const REQUEST_ID: &str = "x-toggly-request-id";
const SERVICE_NAME: &str = "x-toggly-service-name";
const SERVICE_VERSION: &str = "x-toggly-service-version";

#[tokio::test]
async fn test_generated_request_id_is_echoed() {
    let sink = MemorySink::new();
    let (addr, shutdown) = common::spawn_server(&sink).await;

    let res = common::client()
        .get(format!("http://{}/echo-id", addr))
        .send()
        .await
        .expect("server unreachable");

    let header = res.headers().get(REQUEST_ID).unwrap().to_str().unwrap().to_string();
    assert!(!header.is_empty());
    assert_eq!(res.text().await.unwrap(), header);

    shutdown.trigger();
}

#[tokio::test]
async fn test_supplied_request_id_round_trips() {
    let sink = MemorySink::new();
    let (addr, shutdown) = common::spawn_server(&sink).await;

    let res = common::client()
        .get(format!("http://{}/", addr))
        .header("X-Toggly-Request-Id", "UNIT-REQ-1234")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers().get(REQUEST_ID).unwrap(), "UNIT-REQ-1234");

    let info = sink.messages_at(Severity::Info);
    let start = info.iter().find(|l| l.contains("[START]")).unwrap();
    assert!(start.starts_with(&format!("[UNIT-REQ-1234] [START] GET http://{}/ - 127.0.0.1:", addr)), "{start}");
    let end = info.iter().find(|l| l.contains("[END]")).unwrap();
    assert!(end.starts_with(&format!("[UNIT-REQ-1234] [END] http://{}/ - 200, 17B, ", addr)), "{end}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_service_headers_on_every_path() {
    let sink = MemorySink::new();
    let (addr, shutdown) = common::spawn_server(&sink).await;
    let client = common::client();

    for path in ["/", "/health", "/version", "/does-not-exist"] {
        let res = client.get(format!("http://{}{}", addr, path)).send().await.unwrap();
        assert_eq!(res.headers().get(SERVICE_NAME).unwrap(), "shield", "path {path}");
        assert_eq!(res.headers().get(SERVICE_VERSION).unwrap(), "1.0.0", "path {path}");
        assert!(res.headers().get(REQUEST_ID).is_some(), "path {path}");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_excluded_path_is_silent() {
    let sink = MemorySink::new();
    let (addr, shutdown) = common::spawn_server(&sink).await;

    let res = common::client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "ok");
    assert!(sink.is_empty(), "{:?}", sink.lines());

    shutdown.trigger();
}

async fn exploding_handler() -> &'static str {
    panic!("flag evaluation exploded")
}

#[tokio::test]
async fn test_panicking_handler_is_recorded_and_answered() {
    panic_hook::install();

    let sink = MemorySink::new();
    let routes = Router::new()
        .route("/boom", get(exploding_handler))
        .route("/ok", get(|| async { "still serving" }));
    let (addr, shutdown) = common::spawn_instrumented(routes, &sink).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/boom", addr))
        .header("X-Toggly-Request-Id", "boom-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.headers().get(REQUEST_ID).unwrap(), "boom-1");
    assert_eq!(res.headers().get(SERVICE_NAME).unwrap(), "shield");

    let fatal = sink.messages_at(Severity::Fatal);
    assert_eq!(fatal.len(), 1);
    assert!(fatal[0].ends_with(", flag evaluation exploded"), "{}", fatal[0]);
    assert!(sink.lines().iter().all(|l| !l.message.contains("[END]")));

    // The process keeps serving after a recorded panic.
    let res = client.get(format!("http://{}/ok", addr)).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "still serving");

    shutdown.trigger();
}

#[tokio::test]
async fn test_handler_error_status_logged_at_error() {
    let sink = MemorySink::new();
    let routes = Router::new().route(
        "/teapot",
        get(|| async { (axum::http::StatusCode::IM_A_TEAPOT, "short and stout") }),
    );
    let (addr, shutdown) = common::spawn_instrumented(routes, &sink).await;

    let res = common::client()
        .get(format!("http://{}/teapot", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 418);

    let errors = sink.messages_at(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains(&format!("[END] http://{}/teapot - 418, 15B, ", addr)), "{}", errors[0]);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(10)).await;
}
