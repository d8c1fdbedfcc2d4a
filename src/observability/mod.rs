//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages:
//!     → timing.rs  (X-Response-Time header)
//!     → logging.rs (access log span/event per request)
//! Core:
//!     → metrics.rs (counters, histograms)
//! ```

pub mod logging;
pub mod metrics;
pub mod timing;
