//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, connect info, graceful shutdown)
//!     → pipeline.rs (response-time, rate limit, security headers, CORS,
//!                    compression, access log)
//!     → proxy core (resolve → admit → redirect | forward)
//!     → response streamed back through the pipeline
//! ```

pub mod cors;
pub mod pipeline;
pub mod server;

pub use pipeline::{Pipeline, Stage};
pub use server::HttpServer;
