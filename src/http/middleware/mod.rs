//! Request-pipeline middleware.
//!
//! Built-in middleware live next to the concern they serve
//! (`security::*`, `session::SessionLoader`); this module holds the stack
//! that composes them.

pub mod stack;

pub use stack::{Middleware, MiddlewareArgs, MiddlewareEntry, MiddlewareStack};
