//! Admission guard: redirect or forward.
//!
//! A request without `Origin` is a top-level navigation, so the browser is
//! sent straight to the target. Cross-origin fetches carry `Origin` and get
//! proxied.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ProxyError;
use crate::proxy::resolver::ResolvedTarget;

/// What to do with a resolved request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyDecision {
    Redirect,
    Forward,
}

/// Decide from the inbound headers. An empty `Origin` counts as absent.
pub fn admit(headers: &HeaderMap) -> ProxyDecision {
    match headers.get(header::ORIGIN) {
        Some(origin) if !origin.is_empty() => ProxyDecision::Forward,
        _ => ProxyDecision::Redirect,
    }
}

/// `302 Found` pointing at the target, empty body.
pub fn redirect(target: &ResolvedTarget) -> Result<Response, ProxyError> {
    let location = HeaderValue::from_str(target.as_str())
        .map_err(|_| ProxyError::InvalidLocation(target.as_str().to_string()))?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::resolver::resolve;

    #[test]
    fn missing_origin_redirects() {
        assert_eq!(admit(&HeaderMap::new()), ProxyDecision::Redirect);
    }

    #[test]
    fn empty_origin_redirects() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static(""));
        assert_eq!(admit(&headers), ProxyDecision::Redirect);
    }

    #[test]
    fn origin_forwards() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://app.example.com"));
        assert_eq!(admit(&headers), ProxyDecision::Forward);
    }

    #[test]
    fn opaque_origin_still_forwards() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("null"));
        assert_eq!(admit(&headers), ProxyDecision::Forward);
    }

    #[test]
    fn redirect_points_at_decoded_target() {
        let target = resolve("/https%3A%2F%2Fapi.example.com%2Fv1%2Fping").unwrap();
        let response = redirect(&target).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://api.example.com/v1/ping"
        );
    }
}
