//! Error types for the request path.
//!
//! Every stage returns a typed error; [`ProxyError`] is the single place
//! where a failure becomes an HTTP response.

use std::any::Any;

use axum::{
    body::Body,
    http::{header, Response as HttpResponse, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The request path does not decode to an absolute URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("URI malformed")]
    MalformedEncoding,

    #[error("Invalid URL {input:?}: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
}

/// The outbound call to the target failed before a response arrived.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream timed out: {0}")]
    Timeout(String),

    #[error("upstream connection failed: {0}")]
    Connect(String),

    #[error("cannot build upstream request: {0}")]
    InvalidRequest(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl ForwardError {
    /// Classify a client error, keeping the whole cause chain as text.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let detail = error_chain(&err);
        if err.is_timeout() {
            ForwardError::Timeout(detail)
        } else if err.is_connect() {
            ForwardError::Connect(detail)
        } else if err.is_builder() {
            ForwardError::InvalidRequest(detail)
        } else {
            ForwardError::Upstream(detail)
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Terminal error for a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error("target host not allowed: {0}")]
    TargetDenied(String),

    #[error("target cannot be used as a header value: {0}")]
    InvalidLocation(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::TargetDenied(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Resolve(_) => "resolve",
            ProxyError::Forward(ForwardError::Timeout(_)) => "timeout",
            ProxyError::Forward(_) => "forward",
            ProxyError::TargetDenied(_) => "denied",
            ProxyError::InvalidLocation(_) => "location",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), format!("Error: {}", self)).into_response()
    }
}

/// Backstop for panics inside the request handler.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> HttpResponse<Body> {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "internal error"
    };

    tracing::error!(panic = %message, "Request handler panicked");

    let mut response = HttpResponse::new(Body::from(format!("Error: {}", message)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
