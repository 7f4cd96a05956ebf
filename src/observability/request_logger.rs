//! Request-scoped logger for handler code.
//!
//! Prefixes every message with `[<req_id>] ` so ad-hoc handler logs line up
//! with the access log of the same request.

use std::convert::Infallible;
use std::fmt;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::http::request::{RequestId, RequestIdExt};
use crate::observability::sink::{Severity, SharedSink};

/// Logger bound to one request's correlation id.
///
/// Usable as a handler argument when the router state provides a
/// [`SharedSink`] through `FromRef`.
#[derive(Clone)]
pub struct RequestLogger {
    sink: SharedSink,
    request_id: Option<RequestId>,
}

impl RequestLogger {
    pub fn new(sink: SharedSink, request_id: Option<RequestId>) -> Self {
        Self { sink, request_id }
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.emit(Severity::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.emit(Severity::Info, message);
    }

    pub fn warning(&self, message: impl fmt::Display) {
        self.emit(Severity::Warning, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.emit(Severity::Error, message);
    }

    /// Formatted error, e.g. `log.errorf(format_args!("lookup failed: {err}"))`.
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.emit(Severity::Error, args);
    }

    fn emit(&self, severity: Severity, message: impl fmt::Display) {
        match &self.request_id {
            Some(id) => self.sink.logf(severity, format_args!("[{}] {}", id, message)),
            None => self.sink.logf(severity, format_args!("{}", message)),
        }
    }
}

impl<S> FromRequestParts<S> for RequestLogger
where
    S: Send + Sync,
    SharedSink: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new(SharedSink::from_ref(state), parts.request_id().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::sink::MemorySink;
    use std::sync::Arc;

    #[test]
    fn test_prefixes_request_id() {
        let sink = MemorySink::new();
        let log = RequestLogger::new(Arc::new(sink.clone()), Some(RequestId::new("abc-123")));

        log.info("flag evaluated");
        log.warning(format_args!("{} rules skipped", 2));
        log.errorf(format_args!("lookup failed: {}", "timeout"));
        log.debug("cache hit");

        let lines = sink.lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].severity, Severity::Info);
        assert_eq!(lines[0].message, "[abc-123] flag evaluated");
        assert_eq!(lines[1].severity, Severity::Warning);
        assert_eq!(lines[1].message, "[abc-123] 2 rules skipped");
        assert_eq!(lines[2].severity, Severity::Error);
        assert_eq!(lines[2].message, "[abc-123] lookup failed: timeout");
        assert_eq!(lines[3].severity, Severity::Debug);
    }

    #[test]
    fn test_without_request_id_forwards_unmodified() {
        let sink = MemorySink::new();
        let log = RequestLogger::new(Arc::new(sink.clone()), None);

        log.error("plain message");
        assert_eq!(sink.messages_at(Severity::Error), vec!["plain message".to_string()]);
    }

    #[tokio::test]
    async fn test_extracted_from_request_parts() {
        let sink = MemorySink::new();
        let shared: SharedSink = Arc::new(sink.clone());

        let (mut parts, _) = axum::http::Request::builder()
            .uri("/")
            .extension(RequestId::new("from-parts"))
            .body(())
            .unwrap()
            .into_parts();

        let log = RequestLogger::from_request_parts(&mut parts, &shared).await.unwrap();
        log.info("hello");
        assert_eq!(sink.messages_at(Severity::Info), vec!["[from-parts] hello".to_string()]);
    }
}
