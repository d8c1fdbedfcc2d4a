//! Ordered request/response stages around the proxy core.
//!
//! ```text
//! request  → ResponseTime → RateLimit → SecurityHeaders → Cors → Compression → AccessLog → core
//! response ← ResponseTime ← RateLimit ← SecurityHeaders ← Cors ← Compression ← AccessLog ← core
//! ```
//!
//! The order lives in [`Stage::ORDER`] and [`Pipeline::wrap`] applies it,
//! so rate limiting always runs before the core and compression always
//! sees the core's response.

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::compression::{
    predicate::{And, NotForContentType, Predicate, SizeAbove},
    CompressionLayer,
};

use crate::config::{CompressionConfig, ProxyConfig};
use crate::http::cors;
use crate::observability::{logging, timing};
use crate::security::{headers, rate_limit, RateLimiter};

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResponseTime,
    RateLimit,
    SecurityHeaders,
    Cors,
    Compression,
    AccessLog,
}

impl Stage {
    /// Outermost first.
    pub const ORDER: [Stage; 6] = [
        Stage::ResponseTime,
        Stage::RateLimit,
        Stage::SecurityHeaders,
        Stage::Cors,
        Stage::Compression,
        Stage::AccessLog,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ResponseTime => "response-time",
            Stage::RateLimit => "rate-limit",
            Stage::SecurityHeaders => "security-headers",
            Stage::Cors => "cors",
            Stage::Compression => "compression",
            Stage::AccessLog => "access-log",
        }
    }
}

/// The configured stage chain.
#[derive(Debug, Clone)]
pub struct Pipeline {
    rate_limiter: Option<Arc<RateLimiter>>,
    compression: Option<CompressionConfig>,
}

impl Pipeline {
    pub fn new(config: &ProxyConfig) -> Self {
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));
        let compression = config
            .compression
            .enabled
            .then(|| config.compression.clone());

        Self {
            rate_limiter,
            compression,
        }
    }

    /// Shared limiter, if rate limiting is enabled.
    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    /// Enabled stages, outermost first.
    pub fn stages(&self) -> Vec<Stage> {
        Stage::ORDER
            .into_iter()
            .filter(|stage| match stage {
                Stage::RateLimit => self.rate_limiter.is_some(),
                Stage::Compression => self.compression.is_some(),
                _ => true,
            })
            .collect()
    }

    /// Wrap `router` in every enabled stage.
    pub fn wrap(&self, router: Router) -> Router {
        // Router::layer wraps outside what is already there, so apply innermost first.
        self.stages()
            .into_iter()
            .rev()
            .fold(router, |router, stage| self.apply(router, stage))
    }

    fn apply(&self, router: Router, stage: Stage) -> Router {
        match stage {
            Stage::ResponseTime => router.layer(from_fn(timing::response_time_middleware)),
            Stage::RateLimit => match &self.rate_limiter {
                Some(limiter) => router.layer(from_fn_with_state(
                    Arc::clone(limiter),
                    rate_limit::rate_limit_middleware,
                )),
                None => router,
            },
            Stage::SecurityHeaders => router.layer(from_fn(headers::security_headers_middleware)),
            Stage::Cors => cors::wrap(router),
            Stage::Compression => match &self.compression {
                Some(config) => router.layer(compression_layer(config)),
                None => router,
            },
            Stage::AccessLog => router.layer(logging::access_log_layer()),
        }
    }
}

type CompressWhen = And<And<And<SizeAbove, NotForContentType>, NotForContentType>, NotForContentType>;

fn compression_layer(config: &CompressionConfig) -> CompressionLayer<CompressWhen> {
    let predicate = SizeAbove::new(config.min_size)
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE);

    CompressionLayer::new().compress_when(predicate)
}
