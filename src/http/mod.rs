//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum + tower layers: request id, trace, timeout, limits)
//!     → middleware/ (MiddlewareStack built around the base application)
//!     → app.rs (RPC endpoint or route match, auth, handler)
//!     → response.rs (json / redirect / view / default / auto)
//!     → Send to client
//! ```

pub mod app;
pub mod endpoint;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use app::Application;
pub use endpoint::Endpoint;
pub use middleware::{Middleware, MiddlewareArgs, MiddlewareEntry, MiddlewareStack};
pub use request::X_REQUEST_ID;
pub use response::ResponseKind;
pub use server::HttpServer;
