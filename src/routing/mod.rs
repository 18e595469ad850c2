//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route file (text, one route per line)
//!     → grammar.rs (tokenize, parse, RouteSyntaxError on bad lines)
//!     → table.rs (ordered RouteTable, frozen)
//!
//! Incoming Request (method, path)
//!     → router.rs (scan web routes in file order)
//!     → matcher.rs (segment-wise pattern match, bind :params)
//!     → Return: RouteMatch or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes parsed at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (file order)

pub mod definition;
pub mod grammar;
pub mod matcher;
pub mod router;
pub mod table;

pub use definition::{Binding, HandlerReference, RouteDefinition, RouteKind, RouteTarget, Verb};
pub use grammar::{RouteSyntaxError, SyntaxErrorKind};
pub use matcher::{PathParams, PathPattern};
pub use router::{MatchResult, RouteMatch, Router};
pub use table::{RouteLoadError, RouteTable};
