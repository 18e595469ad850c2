//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (as middleware, outermost first):
//!     → headers.rs (security headers on the way out)
//!     → rate_limit.rs (per-client fixed window, 429)
//!     → csrf.rs (double-submit token on unsafe methods, 403)
//! Inside the base application:
//!     → limits.rs (body size, 413)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rate-limit backend failure rejects unless opted out
//! - Security-aware middleware read the shared SecurityConfig

pub mod csrf;
pub mod headers;
pub mod limits;
pub mod rate_limit;

pub use csrf::CsrfProtection;
pub use headers::SecurityHeaders;
pub use limits::read_limited;
pub use rate_limit::{BackendUnavailable, Decision, InMemoryBackend, RateLimit, RateLimitBackend};
