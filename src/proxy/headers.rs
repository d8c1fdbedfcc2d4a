//! Outbound header preparation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Point `Host` at the target
//! - Append X-Forwarded-For / -Port / -Proto, fill X-Forwarded-Host
//!
//! Forwarded values from upstream proxies are kept; ours are appended.

use std::net::SocketAddr;

use axum::http::{
    header::{self, HeaderName},
    HeaderMap, HeaderValue,
};

use crate::proxy::resolver::ResolvedTarget;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PORT: HeaderName = HeaderName::from_static("x-forwarded-port");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Build the header set for the outbound request.
///
/// `proto` is the scheme the client used to reach us.
pub fn outbound_headers(
    inbound: &HeaderMap,
    target: &ResolvedTarget,
    client: Option<SocketAddr>,
    proto: &str,
) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);

    let inbound_host = headers.remove(header::HOST);
    if let Ok(host) = HeaderValue::from_str(target.host()) {
        headers.insert(header::HOST, host);
    }

    if let Some(addr) = client {
        append_forwarded(&mut headers, X_FORWARDED_FOR, &addr.ip().to_string());
    }
    let port = inbound_host
        .as_ref()
        .and_then(|h| h.to_str().ok())
        .and_then(host_port)
        .unwrap_or(if proto == "https" { 443 } else { 80 });
    append_forwarded(&mut headers, X_FORWARDED_PORT, &port.to_string());
    append_forwarded(&mut headers, X_FORWARDED_PROTO, proto);

    if !headers.contains_key(X_FORWARDED_HOST) {
        if let Some(host) = inbound_host {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }

    headers
}

/// Append `value` to a comma separated forwarded header.
fn append_forwarded(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    let existing: Vec<&str> = headers
        .get_all(&name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .collect();

    let combined = if existing.is_empty() {
        value.to_string()
    } else {
        format!("{},{}", existing.join(","), value)
    };

    if let Ok(v) = HeaderValue::from_str(&combined) {
        headers.insert(name, v);
    }
}

/// Port of a `Host` header value, if explicit.
fn host_port(host: &str) -> Option<u16> {
    // IPv6 literals keep their colons inside brackets.
    let after_bracket = host.rsplit(']').next().unwrap_or(host);
    after_bracket.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
}
