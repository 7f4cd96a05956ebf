//! Static service metadata.
//!
//! `version_layer` puts the deployment's version tag into request extensions;
//! `ServiceInfoLayer` stamps the service name and version on every response.

use std::fmt;
use std::sync::Arc;

use axum::http::{header::InvalidHeaderValue, HeaderName, HeaderValue};
use axum::Extension;
use tower::Layer;
use tower_http::set_header::SetResponseHeader;

pub const X_TOGGLY_SERVICE_NAME: HeaderName = HeaderName::from_static("x-toggly-service-name");
pub const X_TOGGLY_SERVICE_VERSION: HeaderName = HeaderName::from_static("x-toggly-service-version");

/// Version tag made available to handlers through `Extension<VersionTag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag(Arc<str>);

impl VersionTag {
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layer inserting the given version tag into every request.
pub fn version_layer(tag: impl Into<Arc<str>>) -> Extension<VersionTag> {
    Extension(VersionTag::new(tag))
}

/// Layer setting `X-Toggly-Service-Name` and `X-Toggly-Service-Version`.
///
/// Values set here override anything the wrapped handlers put in those headers.
#[derive(Debug, Clone)]
pub struct ServiceInfoLayer {
    name: HeaderValue,
    version: HeaderValue,
}

impl ServiceInfoLayer {
    pub fn new(name: &str, version: &str) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            name: HeaderValue::from_str(name)?,
            version: HeaderValue::from_str(version)?,
        })
    }
}

impl<S> Layer<S> for ServiceInfoLayer {
    type Service = SetResponseHeader<SetResponseHeader<S, HeaderValue>, HeaderValue>;

    fn layer(&self, inner: S) -> Self::Service {
        let with_version =
            SetResponseHeader::overriding(inner, X_TOGGLY_SERVICE_VERSION, self.version.clone());
        SetResponseHeader::overriding(with_version, X_TOGGLY_SERVICE_NAME, self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "root" }))
            .route(
                "/version",
                get(|Extension(tag): Extension<VersionTag>| async move { tag.to_string() }),
            )
            .route(
                "/spoof",
                get(|| async { ([("x-toggly-service-name", "impostor")], "spoofed") }),
            )
            .layer(version_layer("v1.0"))
            .layer(ServiceInfoLayer::new("shield", "1.0.0").unwrap())
    }

    #[tokio::test]
    async fn test_service_info_headers_on_every_path() {
        for path in ["/", "/version", "/spoof", "/missing"] {
            let req = Request::builder().uri(path).body(Body::empty()).unwrap();
            let res = app().oneshot(req).await.unwrap();

            let names: Vec<_> = res.headers().get_all(&X_TOGGLY_SERVICE_NAME).iter().collect();
            assert_eq!(names, vec!["shield"], "path {path}");
            assert_eq!(res.headers().get(&X_TOGGLY_SERVICE_VERSION).unwrap(), "1.0.0");
        }
    }

    #[tokio::test]
    async fn test_version_tag_visible_downstream() {
        let req = Request::builder().uri("/version").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"v1.0");
    }

    #[test]
    fn test_rejects_invalid_header_value() {
        assert!(ServiceInfoLayer::new("bad\nname", "1.0.0").is_err());
    }
}
