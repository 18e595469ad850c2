//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route (auth option)
//!     → strategy.rs (parse requirement, pick strategy)
//!     → context.rs (session, headers, params, client ip/country)
//!     → Ok(StrategyResult) → handler
//!     → Err(AuthFailure)   → 401 / 403 response, handler skipped
//! ```
//!
//! # Design Decisions
//! - Closed set of strategies, selected by requirement prefix
//! - Results are immutable per-request values; no state kept across requests
//! - Routes without a requirement still produce an anonymous result

pub mod context;
pub mod geo;
pub mod result;
pub mod strategy;

pub use context::{ContextFactory, RequestContext};
pub use geo::{GeoResolver, StaticGeoResolver};
pub use result::{AuthFailure, FailureKind, StrategyResult, User, UserRecord};
pub use strategy::{AuthRequirement, RequirementError, StrategyKind, StrategyResolver};
