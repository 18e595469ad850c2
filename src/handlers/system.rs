//! Built-in `System` handlers registered by the server binary.
//!
//! ```text
//! GET  /health   System#health
//! MCP  routes    System.routes
//! TOOL echo      System.echo
//! ```

use std::sync::Arc;

use serde_json::{json, Value};

use crate::handlers::handler::{HandlerContext, HandlerError};
use crate::handlers::output::HandlerOutput;
use crate::handlers::registry::HandlerRegistry;
use crate::rpc::method_name;
use crate::routing::RouteTable;

/// Register `System#health`, `System.routes` and `System.echo`.
pub fn register(registry: &mut HandlerRegistry, table: Arc<RouteTable>) {
    registry.register("System#health", health);
    registry.register("System.echo", echo);
    registry.register("System.routes", move |_ctx: HandlerContext| {
        let table = table.clone();
        async move { Ok::<_, HandlerError>(HandlerOutput::Json(describe(&table))) }
    });
}

async fn health(ctx: HandlerContext) -> Result<HandlerOutput, HandlerError> {
    Ok(HandlerOutput::json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "authenticated": ctx.auth.is_authenticated(),
    })))
}

async fn echo(ctx: HandlerContext) -> Result<HandlerOutput, HandlerError> {
    Ok(HandlerOutput::Json(Value::Object(ctx.args)))
}

/// The route table as JSON, one entry per route in file order.
pub fn describe(table: &RouteTable) -> Value {
    let routes: Vec<Value> = table
        .iter()
        .map(|route| {
            json!({
                "line": route.line,
                "route": route.to_string(),
                "kind": format!("{:?}", route.kind()),
                "rpc_method": method_name(route),
            })
        })
        .collect();
    json!({ "routes": routes })
}
