//! Route handlers.
//!
//! # Data Flow
//! ```text
//! RouteDefinition.handler (Namespace#method / Namespace.method)
//!     → registry.rs (look up implementation)
//!     → handler.rs (invoke with HandlerContext, panics caught)
//!     → output.rs (tagged HandlerOutput)
//!     → http::response (web) or rpc::dispatcher (MCP/TOOL)
//! ```

pub mod handler;
pub mod output;
pub mod registry;
pub mod system;

pub use handler::{invoke, Handler, HandlerContext, HandlerError, HandlerFuture};
pub use output::{HandlerOutput, Html, Renderable, ResponseDraft};
pub use registry::HandlerRegistry;
