//! Client address resolution.
//!
//! The first `X-Forwarded-For` entry wins over the socket peer, which means
//! the header is trusted as-is.

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// First address listed in `X-Forwarded-For`, if the header is present.
pub fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(&X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
}

/// Best guess at the originating client IP.
pub fn real_ip_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    forwarded_for(headers)
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}
