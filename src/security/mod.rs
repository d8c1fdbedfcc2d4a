//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client fixed window, 429 before the core runs)
//!     → [core]
//!     → headers.rs (defensive response headers)
//! ```
//!
//! Target restrictions are not enforced here; see `proxy::policy`.

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{RateLimitStatus, RateLimiter};
