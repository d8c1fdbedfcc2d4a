//! Defensive response headers.
//!
//! Each header is a default: a value already set by the target wins.
//! Content-Security-Policy and the cross-origin isolation headers
//! (COEP, COOP, CORP) are never added, as they would break the pages
//! the proxy relays for.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const SECURITY_HEADERS: [(&str, &str); 9] = [
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-download-options", "noopen"),
    ("x-content-type-options", "nosniff"),
    ("origin-agent-cluster", "?1"),
    ("x-permitted-cross-domain-policies", "none"),
    ("referrer-policy", "no-referrer"),
    ("x-xss-protection", "0"),
];

const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Add missing security headers and drop `X-Powered-By`.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert(HeaderValue::from_static(value));
    }
    headers.remove(X_POWERED_BY);
}

/// Pipeline stage wrapper around [`apply_security_headers`].
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}
