//! Bounce proxy library.
//!
//! An open relay for cross-origin browser requests: the target URL is the
//! request path, e.g. `GET /https%3A%2F%2Fapi.example.com%2Fv1%2Fping`.
//! Requests without `Origin` are redirected to the target; requests with
//! `Origin` are forwarded and the response streamed back.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
