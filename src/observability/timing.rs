//! `X-Response-Time` header, measured up to the point the response head
//! is ready. Streaming bodies keep flowing after the header is set.
//!
//! The proxy's own measurement replaces any value the target sent.

use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

/// Header value in milliseconds with three decimals, e.g. `12.345ms`.
pub fn format_response_time(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0)
}

pub async fn response_time_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&format_response_time(start.elapsed())) {
        response.headers_mut().insert(X_RESPONSE_TIME, value);
    }
    response
}
