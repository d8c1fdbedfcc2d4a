//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the proxy handler on every path
//! - Wrap it in the pipeline stages and the panic backstop
//! - Serve with connect info so stages and the core see the client address
//! - Graceful shutdown on signal or on the [`Shutdown`](crate::lifecycle::Shutdown) broadcast

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::ProxyConfig;
use crate::error::{panic_response, ProxyError};
use crate::http::pipeline::Pipeline;
use crate::lifecycle;
use crate::observability::metrics;
use crate::proxy::{policy, Forwarder, ProxyCore, ProxyDecision};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub core: ProxyCore,
}

/// HTTP server for the bounce proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pipeline: Pipeline,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let forwarder = Forwarder::new(&config.timeouts, &config.tls)?;
        let core = ProxyCore::new(forwarder, policy::from_config(&config.policy));
        let pipeline = Pipeline::new(&config);

        let router = Self::build_router(&pipeline, AppState { core });
        Ok(Self {
            router,
            config,
            pipeline,
        })
    }

    fn build_router(pipeline: &Pipeline, state: AppState) -> Router {
        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response));

        pipeline.wrap(router)
    }

    /// The fully wrapped router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Serve on `listener` until a signal arrives or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let stages: Vec<_> = self.pipeline.stages().iter().map(|s| s.name()).collect();
        tracing::info!(
            address = %addr,
            stages = ?stages,
            connect_timeout_ms = self.config.timeouts.connect_ms,
            response_timeout_ms = self.config.timeouts.response_ms,
            "HTTP server starting"
        );

        let sweeper = self.pipeline.rate_limiter().map(|limiter| limiter.spawn_sweeper());

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => tracing::info!("Shutdown requested"),
                    _ = lifecycle::wait_for_signal() => {}
                }
            })
            .await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        tracing::info!("HTTP server stopped");
        result
    }
}

/// Main proxy handler: resolve, admit, then redirect or forward.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let method = request.method().clone();
    let uri = request.uri().clone();

    match state.core.handle(request, client).await {
        Ok((decision, response)) => {
            let outcome = match decision {
                ProxyDecision::Redirect => "redirected",
                ProxyDecision::Forward => "relayed",
            };
            metrics::record_request(outcome, response.status().as_u16(), start);
            response
        }
        Err(err) => fail(err, &method, &uri, start),
    }
}

/// Terminal error handler.
fn fail(err: ProxyError, method: &axum::http::Method, uri: &axum::http::Uri, start: Instant) -> Response {
    match &err {
        ProxyError::Resolve(_) | ProxyError::TargetDenied(_) => {
            tracing::warn!(method = %method, uri = %uri, kind = err.kind(), error = %err, "Request rejected")
        }
        _ => tracing::error!(method = %method, uri = %uri, kind = err.kind(), error = %err, "Proxy request failed"),
    }
    metrics::record_request(err.kind(), err.status().as_u16(), start);
    err.into_response()
}
