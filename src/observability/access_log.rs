//! Request access logging.
//!
//! # Responsibilities
//! - Build the initial [`FieldSet`] when a request arrives
//! - Emit the START line unless the request target is excluded
//! - Emit exactly one END or PANIC line per request
//!
//! # Lifecycle
//! ```text
//! new_log_entry ──▶ Started ──write──▶ Completed   ([END] line, or nothing if skipped)
//!                          └──panic──▶ Panicked    (<stack>, <panic> at Fatal)
//! ```
//! Any terminal call after the first is ignored.

use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::{header, uri::Scheme, HeaderMap, Request, StatusCode};
use chrono::Utc;

use crate::http::forwarded::forwarded_for;
use crate::http::request::{RequestIdExt, TlsConnection};
use crate::observability::fields::{FieldSet, PanicFields, ResponseFields};
use crate::observability::sink::{Severity, SharedSink};

/// Exact request targets (path plus query) that are not access-logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList(HashSet<String>);

impl ExclusionList {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(targets.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, target: &str) -> bool {
        self.0.contains(target)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds a log entry for each incoming request.
pub trait LogFormatter: Send + Sync + 'static {
    type Entry: LogEntry + Send + 'static;

    /// Called once per request, before the handler chain runs.
    fn new_log_entry<B>(&self, req: &Request<B>) -> Self::Entry;
}

/// Request-scoped log record receiving one terminal event.
///
/// Both methods return `true` only for the call that ended the entry.
pub trait LogEntry {
    fn write(&mut self, status: StatusCode, bytes: u64, headers: &HeaderMap, elapsed: Duration) -> bool;

    fn panic(&mut self, payload: &(dyn Any + Send), stack: &str) -> bool;
}

/// Formatter producing the START/END/PANIC line format.
#[derive(Clone)]
pub struct AccessLogFormatter {
    sink: SharedSink,
    excludes: Arc<ExclusionList>,
}

impl AccessLogFormatter {
    pub fn new(sink: SharedSink, excludes: ExclusionList) -> Self {
        Self {
            sink,
            excludes: Arc::new(excludes),
        }
    }

    pub fn excludes(&self) -> &ExclusionList {
        &self.excludes
    }

    fn fields_for<B>(req: &Request<B>) -> FieldSet {
        let headers = req.headers();

        let tls = req.extensions().get::<TlsConnection>().is_some()
            || req.uri().scheme() == Some(&Scheme::HTTPS);
        let http_scheme = if tls { "https" } else { "http" };

        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().authority().map(|a| a.as_str()))
            .unwrap_or_default();
        let target = request_target(req);

        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut fields = FieldSet {
            ts: Utc::now(),
            req_id: req.request_id().cloned(),
            http_scheme,
            http_proto: format!("{:?}", req.version()),
            http_method: req.method().to_string(),
            remote_addr,
            user_agent,
            uri: format!("{}://{}{}", http_scheme, host, target),
            skip: false,
            response: None,
            panic: None,
            extra: BTreeMap::new(),
        };
        if let Some(ip) = forwarded_for(headers) {
            fields.insert("real_ip", ip);
        }
        fields
    }
}

impl LogFormatter for AccessLogFormatter {
    type Entry = AccessLogEntry;

    fn new_log_entry<B>(&self, req: &Request<B>) -> AccessLogEntry {
        let mut fields = Self::fields_for(req);

        if self.excludes.contains(request_target(req)) {
            fields.skip = true;
        } else {
            let line = format!(
                "[{}] [START] {} {} - {}, {}",
                fields.req_id_display(),
                fields.http_method,
                fields.uri,
                fields.remote_addr,
                fields.user_agent,
            );
            self.sink.log_fields(Severity::Info, &line, &fields);
        }

        AccessLogEntry {
            sink: self.sink.clone(),
            fields,
            state: EntryState::Started,
        }
    }
}

/// Where an [`AccessLogEntry`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Started,
    Completed,
    Panicked,
}

/// Access log record owned by a single request.
pub struct AccessLogEntry {
    sink: SharedSink,
    fields: FieldSet,
    state: EntryState,
}

impl AccessLogEntry {
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn is_skipped(&self) -> bool {
        self.fields.skip
    }

    fn finish(&mut self, next: EntryState) -> bool {
        if self.state != EntryState::Started {
            tracing::debug!(
                req_id = self.fields.req_id_display(),
                state = ?self.state,
                "Ignoring repeated terminal event for log entry"
            );
            return false;
        }
        self.state = next;
        true
    }
}

impl LogEntry for AccessLogEntry {
    fn write(&mut self, status: StatusCode, bytes: u64, _headers: &HeaderMap, elapsed: Duration) -> bool {
        if !self.finish(EntryState::Completed) {
            return false;
        }
        if self.fields.skip {
            return true;
        }

        let elapsed_ms = elapsed.as_nanos() as f64 / 1_000_000.0;
        let status = status.as_u16();
        self.fields.response = Some(ResponseFields {
            status,
            bytes,
            elapsed_ms,
        });

        let line = format!(
            "[{}] [END] {} - {}, {}B, {}ms",
            self.fields.req_id_display(),
            self.fields.uri,
            status,
            bytes,
            elapsed_ms,
        );
        let severity = if status >= 400 { Severity::Error } else { Severity::Info };
        self.sink.log_fields(severity, &line, &self.fields);
        true
    }

    fn panic(&mut self, payload: &(dyn Any + Send), stack: &str) -> bool {
        if !self.finish(EntryState::Panicked) {
            return false;
        }

        let panic = PanicFields {
            stack: stack.to_string(),
            panic: describe_panic(payload),
        };
        let line = format!("{}, {}", panic.stack, panic.panic);
        self.fields.panic = Some(panic);
        self.sink.log_fields(Severity::Fatal, &line, &self.fields);
        true
    }
}

impl Drop for AccessLogEntry {
    fn drop(&mut self) {
        if self.state == EntryState::Started && !std::thread::panicking() {
            tracing::warn!(
                req_id = self.fields.req_id_display(),
                uri = %self.fields.uri,
                "Log entry dropped without a terminal event"
            );
        }
    }
}

/// Request target as sent on the request line (path and query).
fn request_target<B>(req: &Request<B>) -> &str {
    req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
}

/// Human-readable description of a panic payload.
pub fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
