//! Proxy core.
//!
//! # Data Flow
//! ```text
//! Received
//!     → resolver.rs   (path → ResolvedTarget)            ─ error → Failed
//!     → policy.rs     (allow-list hook, open by default)  ─ denied → Failed
//!     → admission.rs  (no Origin → Redirecting, done)
//!     → forwarder.rs  (Forwarding → Relayed)              ─ error → Failed
//! ```
//!
//! Every stage returns a `Result`; the caller turns `ProxyError` into the
//! response.

pub mod admission;
pub mod forwarder;
pub mod headers;
pub mod policy;
pub mod resolver;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};

pub use admission::ProxyDecision;
pub use forwarder::{Forwarder, OutboundRequest};
pub use policy::{HostAllowList, OpenPolicy, TargetPolicy};
pub use resolver::{resolve, ResolvedTarget};

use crate::error::ProxyError;

/// Resolver, guard and forwarder bound together.
#[derive(Debug, Clone)]
pub struct ProxyCore {
    forwarder: Forwarder,
    policy: Arc<dyn TargetPolicy>,
}

impl ProxyCore {
    pub fn new(forwarder: Forwarder, policy: Arc<dyn TargetPolicy>) -> Self {
        Self { forwarder, policy }
    }

    /// Run one request through the core.
    pub async fn handle(
        &self,
        request: Request<Body>,
        client: Option<SocketAddr>,
    ) -> Result<(ProxyDecision, Response), ProxyError> {
        let raw = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let target = resolve(raw)?;
        if !self.policy.permits(&target) {
            return Err(ProxyError::TargetDenied(target.host().to_string()));
        }

        match admission::admit(request.headers()) {
            ProxyDecision::Redirect => {
                tracing::debug!(url = %target.as_str(), "Redirecting navigation");
                Ok((ProxyDecision::Redirect, admission::redirect(&target)?))
            }
            ProxyDecision::Forward => {
                tracing::debug!(url = %target.as_str(), "Forwarding request");
                let outbound = OutboundRequest::new(request, &target, client);
                let response = self.forwarder.forward(outbound).await?;
                Ok((ProxyDecision::Forward, response))
            }
        }
    }
}
