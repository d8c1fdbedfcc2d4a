//! Outbound call and response relay.
//!
//! # Design Decisions
//! - Exactly one attempt per request, no retries
//! - Upstream redirects are relayed to the caller, never followed
//! - Bodies stream in both directions; dropping the handler future
//!   (client gone) drops the outbound call and its connection
//! - Connect and read phases have separate bounds; the wait for response
//!   headers is additionally capped at connect + response timeout

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{HeaderMap, Method, Request},
    response::Response,
};
use url::Url;

use crate::config::{TimeoutConfig, TlsConfig};
use crate::error::ForwardError;
use crate::proxy::headers::{outbound_headers, strip_hop_by_hop};
use crate::proxy::resolver::ResolvedTarget;

/// The inbound request rebuilt against the target.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

impl OutboundRequest {
    /// Rebuild `request` for `target`. `client` is the caller's socket address.
    pub fn new(request: Request<Body>, target: &ResolvedTarget, client: Option<SocketAddr>) -> Self {
        let (parts, body) = request.into_parts();
        let headers = outbound_headers(&parts.headers, target, client, "http");

        Self {
            method: parts.method,
            url: target.url().clone(),
            headers,
            body,
        }
    }
}

/// Performs outbound calls. Cheap to clone; clones share a connection pool.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    header_deadline: Duration,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig, tls: &TlsConfig) -> Result<Self, reqwest::Error> {
        if !tls.reject_unauthorized {
            tracing::warn!("Outbound TLS certificate verification is disabled");
        }

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .connect_timeout(timeouts.connect())
            .read_timeout(timeouts.response())
            .danger_accept_invalid_certs(!tls.reject_unauthorized)
            .build()?;

        Ok(Self {
            client,
            header_deadline: timeouts.connect() + timeouts.response(),
        })
    }

    /// Send the request and turn the upstream answer into a streamed response.
    pub async fn forward(&self, request: OutboundRequest) -> Result<Response, ForwardError> {
        let OutboundRequest { method, url, headers, body } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        // Known-empty bodies are not sent, so bodiless requests stay unchunked.
        if body.size_hint().exact() != Some(0) {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = match tokio::time::timeout(self.header_deadline, builder.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(ForwardError::from_reqwest(e)),
            Err(_) => {
                return Err(ForwardError::Timeout(format!(
                    "no response within {} ms",
                    self.header_deadline.as_millis()
                )))
            }
        };

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
