//! Waypoint: route-table driven HTTP service core.
//!
//! A line-oriented route file binds HTTP verbs and paths to handlers, and
//! `MCP` / `TOOL` entries to methods on a single JSON-RPC 2.0 endpoint.
//! Every route may declare an `auth` requirement resolved by one of a fixed
//! set of strategies, and a `response_type` deciding how handler output is
//! rendered.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ server (tower layers) ──▶ MiddlewareStack ──▶ Application
//!                                        headers / rate     │
//!                                        limit / session /  ├─▶ /_mcp ──▶ rpc::RpcDispatcher
//!                                        csrf / custom      │                 │
//!                                                           └─▶ routing::Router
//!                                                                             │
//!                                          auth::StrategyResolver ◀───────────┘
//!                                                   │
//!                                          handlers::HandlerRegistry
//!                                                   │
//!   Client ◀──────────────────────────── http::response (json/redirect/view)
//! ```

// Core
pub mod auth;
pub mod handlers;
pub mod routing;
pub mod rpc;

// HTTP surface
pub mod http;
pub mod net;
pub mod security;
pub mod session;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::{HttpError, StartupError};
pub use http::{Application, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::RouteTable;
