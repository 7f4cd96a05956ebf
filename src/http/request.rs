//! Request correlation and request-scoped context.
//!
//! # Responsibilities
//! - Adopt the caller's `X-Toggly-Request-Id` or generate a UUID v4
//! - Publish the id into request extensions for downstream layers
//! - Echo the id on the response so callers can correlate
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer)
//! - Supplied ids are echoed byte-for-byte, no sanitisation; log lines use a
//!   lossy UTF-8 rendering of the same bytes
//! - Exactly one extension write and one response header write per request

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use serde::{Serialize, Serializer};
use tower::{Layer, Service};
use uuid::Uuid;

/// Correlation header, read on the way in and echoed on the way out.
pub const X_TOGGLY_REQUEST_ID: HeaderName = HeaderName::from_static("x-toggly-request-id");

/// Correlation identifier for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId {
    text: Arc<str>,
    header: Option<HeaderValue>,
}

impl RequestId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        let text = id.into();
        let header = HeaderValue::from_str(&text).ok();
        Self { text, header }
    }

    /// Generate a fresh UUID v4 identifier.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Adopt the id carried by the correlation header, if any.
    ///
    /// Only an empty value counts as absent. Opaque (non-UTF-8) bytes are
    /// kept as received.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(&X_TOGGLY_REQUEST_ID)
            .filter(|v| !v.is_empty())
            .map(|v| Self::from_header_value(v.clone()))
    }

    fn from_header_value(value: HeaderValue) -> Self {
        Self {
            text: String::from_utf8_lossy(value.as_bytes()).into(),
            header: Some(value),
        }
    }

    /// Text form used in log lines.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Wire form echoed on the response; `None` if the id cannot be a header.
    pub fn header_value(&self) -> Option<&HeaderValue> {
        self.header.as_ref()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// Marker inserted by a TLS-terminating acceptor for connections it handled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsConnection;

/// Access to the correlation id stored in request extensions.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl RequestIdExt for Extensions {
    fn request_id(&self) -> Option<&RequestId> {
        self.get::<RequestId>()
    }
}

impl RequestIdExt for Parts {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions.request_id()
    }
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().request_id()
    }
}

/// Layer that attaches a [`RequestId`] to every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Service produced by [`RequestIdLayer`].
#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let request_id = RequestId::from_headers(req.headers()).unwrap_or_else(RequestId::generate);
        req.extensions_mut().insert(request_id.clone());

        let fut = self.inner.call(req);
        Box::pin(async move {
            let mut response = fut.await?;
            match request_id.header_value() {
                Some(value) => {
                    response.headers_mut().insert(X_TOGGLY_REQUEST_ID, value.clone());
                }
                None => {
                    tracing::warn!(request_id = %request_id, "Request id is not a valid header value");
                }
            }
            Ok(response)
        })
    }
}
