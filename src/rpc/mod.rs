//! JSON-RPC 2.0 endpoint for MCP resources and tools.
//!
//! # Data Flow
//! ```text
//! POST /_mcp (body = one envelope)
//!     → envelope.rs (parse, validate → -32600 on bad shape, id null if unknown)
//!     → guard.rs (Bearer / X-MCP-Token → -32000 / -32003)
//!     → method.rs (method → route, or built-in initialize manifest)
//!     → dispatcher.rs (route auth, required args, handler, error mapping)
//!     → {"jsonrpc":"2.0", "result" | "error", "id"}
//! ```
//!
//! # Design Decisions
//! - Method table derived once at startup; duplicates fail startup
//! - Batches are rejected, notifications answer 202 with no body
//! - Handler failures never leak detail into the envelope

pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod method;

pub use dispatcher::{RpcDispatcher, RpcReply};
pub use envelope::{parse_request, Payload, Rejection, RpcRequest, RpcResponse, JSONRPC_VERSION};
pub use error::{ErrorCode, RpcError};
pub use guard::TokenGuard;
pub use method::{input_schema, method_name, required_args, MethodTable, MethodTableError, INITIALIZE};
