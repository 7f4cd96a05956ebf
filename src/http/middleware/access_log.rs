//! Access log middleware.
//!
//! Drives a [`LogFormatter`] through one request: the entry is created before
//! the handler chain runs and receives exactly one terminal event afterwards.
//!
//! - Response produced → `write` with status, body length and elapsed time
//! - Handler panicked → `panic` with the payload and captured backtrace, then
//!   the [`PanicPolicy`] decides between re-raising and aborting
//! - Future dropped mid-flight → `write` with 499 (client closed request)

use std::future::{self, Future};
use std::panic::{self, AssertUnwindSafe};
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;

use crate::config::PanicPolicy;
use crate::observability::access_log::{LogEntry, LogFormatter};
use crate::observability::panic_hook;

/// State shared by every invocation of [`access_log_middleware`].
pub struct AccessLogState<F> {
    formatter: Arc<F>,
    panic_policy: PanicPolicy,
}

impl<F> AccessLogState<F> {
    pub fn new(formatter: F, panic_policy: PanicPolicy) -> Self {
        Self {
            formatter: Arc::new(formatter),
            panic_policy,
        }
    }
}

impl<F> Clone for AccessLogState<F> {
    fn clone(&self) -> Self {
        Self {
            formatter: self.formatter.clone(),
            panic_policy: self.panic_policy,
        }
    }
}

/// Middleware function; mount with `axum::middleware::from_fn_with_state`.
pub async fn access_log_middleware<F: LogFormatter>(
    State(state): State<AccessLogState<F>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let mut in_flight = InFlight {
        entry: Some(state.formatter.new_log_entry(&request)),
        start,
    };

    let mut chain = pin!(next.run(request));
    let guarded = future::poll_fn(|cx| {
        panic_hook::clear();
        chain.as_mut().poll(cx)
    });

    match AssertUnwindSafe(guarded).catch_unwind().await {
        Ok(response) => {
            if let Some(mut entry) = in_flight.entry.take() {
                entry.write(
                    response.status(),
                    response_bytes(&response),
                    response.headers(),
                    start.elapsed(),
                );
            }
            response
        }
        Err(payload) => {
            let stack = panic_hook::captured_or_current();
            if let Some(mut entry) = in_flight.entry.take() {
                entry.panic(payload.as_ref(), &stack);
            }
            match state.panic_policy {
                PanicPolicy::Record => panic::resume_unwind(payload),
                PanicPolicy::Abort => {
                    tracing::error!("Aborting process after handler panic");
                    std::process::abort()
                }
            }
        }
    }
}

/// Completes the entry if the request future is dropped before finishing.
struct InFlight<E: LogEntry> {
    entry: Option<E>,
    start: Instant,
}

impl<E: LogEntry> Drop for InFlight<E> {
    fn drop(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            entry.write(client_closed_request(), 0, &HeaderMap::new(), self.start.elapsed());
        }
    }
}

/// Non-standard 499 status used for requests abandoned mid-flight.
fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
}

/// Response body length: `Content-Length` if set, else the exact size hint.
fn response_bytes(response: &Response) -> u64 {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0)
}
