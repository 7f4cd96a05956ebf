//! Structured request record.
//!
//! The fixed request facts are typed fields; ad-hoc additions go into the
//! ordered `extra` map.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::http::request::RequestId;

/// RFC 1123 layout, always rendered in UTC.
const RFC1123_UTC: &str = "%a, %d %b %Y %H:%M:%S UTC";

/// Value stored in the extension map of a [`FieldSet`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

/// Facts recorded once the response is known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFields {
    #[serde(rename = "resp_status")]
    pub status: u16,
    #[serde(rename = "resp_bytes_length")]
    pub bytes: u64,
    #[serde(rename = "resp_elapsed_ms")]
    pub elapsed_ms: f64,
}

/// Facts recorded when the handler chain panicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanicFields {
    pub stack: String,
    pub panic: String,
}

/// Everything known about one request's lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSet {
    #[serde(serialize_with = "serialize_rfc1123")]
    pub ts: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_id: Option<RequestId>,
    pub http_scheme: &'static str,
    pub http_proto: String,
    pub http_method: String,
    pub remote_addr: String,
    pub user_agent: String,
    pub uri: String,
    /// Set when the request target is excluded from access logging.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skip: bool,
    #[serde(flatten)]
    pub response: Option<ResponseFields>,
    #[serde(flatten)]
    pub panic: Option<PanicFields>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, FieldValue>,
}

/// Renders a timestamp as RFC 1123 (`Mon, 02 Jan 2006 15:04:05 UTC`).
fn serialize_rfc1123<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(RFC1123_UTC))
}

impl FieldSet {
    /// Correlation id as it appears in log lines; `-` when absent.
    pub fn req_id_display(&self) -> &str {
        self.req_id.as_ref().map(|id| id.as_str()).unwrap_or("-")
    }

    /// Add or replace an ad-hoc field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.extra.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> FieldSet {
        FieldSet {
            ts: Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap(),
            req_id: Some(RequestId::new("abc")),
            http_scheme: "http",
            http_proto: "HTTP/1.1".into(),
            http_method: "GET".into(),
            remote_addr: "127.0.0.1:5000".into(),
            user_agent: "curl/8.0".into(),
            uri: "http://localhost/flags".into(),
            skip: false,
            response: None,
            panic: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_timestamp_serialized_as_rfc1123() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["ts"], "Mon, 02 Jan 2006 15:04:05 UTC");
    }

    #[test]
    fn test_req_id_display_placeholder() {
        let mut fields = sample();
        assert_eq!(fields.req_id_display(), "abc");
        fields.req_id = None;
        assert_eq!(fields.req_id_display(), "-");
    }

    #[test]
    fn test_json_flattens_response_and_extra() {
        let mut fields = sample();
        fields.response = Some(ResponseFields { status: 201, bytes: 12, elapsed_ms: 1.5 });
        fields.insert("real_ip", "10.0.0.1");
        fields.insert("cached", true);

        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["ts"], "Mon, 02 Jan 2006 15:04:05 UTC");
        assert_eq!(json["req_id"], "abc");
        assert_eq!(json["resp_status"], 201);
        assert_eq!(json["resp_elapsed_ms"], 1.5);
        assert_eq!(json["real_ip"], "10.0.0.1");
        assert_eq!(json["cached"], true);
        assert!(json.get("skip").is_none());
        assert!(json.get("stack").is_none());
    }
}
