//! Dispatch of JSON-RPC envelopes onto MCP/TOOL routes.
//!
//! Every path through [`RpcDispatcher::dispatch`] ends in a well-formed
//! envelope (or a bare 202 for notifications); nothing here returns an
//! error to the caller.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use crate::auth::{ContextFactory, StrategyResolver};
use crate::config::McpConfig;
use crate::handlers::{invoke, HandlerContext, HandlerError, HandlerRegistry};
use crate::observability::metrics;
use crate::routing::{PathParams, RouteDefinition, RouteKind, RouteTable};
use crate::rpc::envelope::{parse_request, RpcRequest, RpcResponse};
use crate::rpc::error::{ErrorCode, RpcError};
use crate::rpc::guard::TokenGuard;
use crate::rpc::method::{required_args, MethodTable, MethodTableError, INITIALIZE};

/// What the endpoint sends back.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    Response(RpcResponse),
    /// A notification was processed; no body.
    Accepted,
}

impl RpcReply {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcReply::Response(response) => response
                .as_error()
                .map(RpcError::http_status)
                .unwrap_or(StatusCode::OK),
            RpcReply::Accepted => StatusCode::ACCEPTED,
        }
    }
}

impl IntoResponse for RpcReply {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            RpcReply::Response(response) => (status, Json(response)).into_response(),
            RpcReply::Accepted => status.into_response(),
        }
    }
}

pub struct RpcDispatcher {
    methods: MethodTable,
    manifest: Value,
    handlers: Arc<HandlerRegistry>,
    resolver: Arc<StrategyResolver>,
    contexts: ContextFactory,
    guard: TokenGuard,
}

impl RpcDispatcher {
    pub fn new(
        table: &RouteTable,
        handlers: Arc<HandlerRegistry>,
        resolver: Arc<StrategyResolver>,
        contexts: ContextFactory,
        config: &McpConfig,
    ) -> Result<Self, MethodTableError> {
        let methods = MethodTable::build(table)?;
        let manifest = methods.manifest(config);
        tracing::info!(
            methods = methods.len(),
            endpoint = %config.endpoint,
            token_required = config.auth_token.is_some(),
            "RPC dispatcher ready"
        );
        Ok(Self {
            methods,
            manifest,
            handlers,
            resolver,
            contexts,
            guard: TokenGuard::from_config(config),
        })
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn manifest(&self) -> &Value {
        &self.manifest
    }

    /// Handle one request body posted to the endpoint.
    pub async fn dispatch(&self, parts: &Parts, body: Bytes) -> RpcReply {
        let request = match parse_request(&body) {
            Ok(request) => request,
            Err(rejection) => {
                tracing::info!(reason = %rejection.error.message, "Rejected RPC envelope");
                metrics::record_rpc_call("invalid", "invalid_request");
                return RpcReply::Response(rejection.into_response());
            }
        };

        let notification = request.is_notification();
        let id = request.response_id();
        let outcome = self.execute(parts, request).await;

        if notification {
            return RpcReply::Accepted;
        }
        RpcReply::Response(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::error(id, error),
        })
    }

    async fn execute(&self, parts: &Parts, request: RpcRequest) -> Result<Value, RpcError> {
        let method = request.method.as_str();

        if let Err(error) = self.guard.check(&parts.headers, method) {
            tracing::info!(rpc_method = %method, code = error.code, "RPC token check failed");
            metrics::record_rpc_call(method, "unauthorized");
            return Err(error);
        }

        if method == INITIALIZE {
            metrics::record_rpc_call(method, "ok");
            return Ok(self.manifest.clone());
        }

        let Some(route) = self.methods.get(method).cloned() else {
            tracing::info!(rpc_method = %method, "Unknown RPC method");
            metrics::record_rpc_call("unknown", "method_not_found");
            return Err(RpcError::method_not_found(method));
        };

        let result = self.call_route(parts, &route, request.params).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(error) if error.code == ErrorCode::InternalError.code() => "error",
            Err(_) => "rejected",
        };
        metrics::record_rpc_call(method, outcome);
        result
    }

    async fn call_route(
        &self,
        parts: &Parts,
        route: &Arc<RouteDefinition>,
        params: Map<String, Value>,
    ) -> Result<Value, RpcError> {
        let context = Arc::new(self.contexts.build(parts, params.clone(), PathParams::new()));

        let auth = self
            .resolver
            .resolve(&context, route.auth_requirement())
            .map_err(|failure| RpcError::forbidden(failure.failure_reason()))?;

        let args = match route.kind() {
            RouteKind::McpTool => {
                check_required(route, &params)?;
                params
            }
            _ => Map::new(),
        };

        let handler = self.handlers.get(&route.handler).ok_or_else(|| {
            tracing::error!(handler = %route.handler, "No handler registered for RPC route");
            RpcError::internal_error()
        })?;

        let ctx = HandlerContext {
            request: context,
            auth,
            args,
            route: route.clone(),
        };

        match invoke(handler, ctx).await {
            Ok(output) => Ok(output.into_json()),
            Err(err) => Err(handler_error(route, err)),
        }
    }
}

fn check_required(route: &RouteDefinition, params: &Map<String, Value>) -> Result<(), RpcError> {
    let missing: Vec<String> = required_args(route)
        .into_iter()
        .filter(|name| !matches!(params.get(name), Some(v) if !v.is_null()))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(RpcError::invalid_request("Missing required arguments").with_data(json!({ "missing": missing })))
}

fn handler_error(route: &RouteDefinition, err: HandlerError) -> RpcError {
    match &err {
        HandlerError::Internal(detail) => {
            tracing::error!(handler = %route.handler, error = %detail, "RPC handler failed");
        }
        other => {
            tracing::info!(handler = %route.handler, error = %other, "RPC handler rejected call");
        }
    }
    RpcError::new(err.rpc_code(), Some(err.public_message().to_string()), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::handlers::HandlerOutput;
    use axum::body::Body;
    use axum::http::Request;

    fn dispatcher(routes: &str, config: McpConfig) -> RpcDispatcher {
        let table = RouteTable::parse(routes).unwrap();
        let mut registry = HandlerRegistry::new();
        registry.register("Users.list", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"users": ["ada", "grace"]})))
        });
        registry.register("Users.create", |ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"created": ctx.arg_str("email")})))
        });
        registry.register("Users.fail", |_ctx: HandlerContext| async move {
            Err::<HandlerOutput, _>(HandlerError::internal("connection refused to 10.0.0.5"))
        });
        RpcDispatcher::new(
            &table,
            Arc::new(registry),
            Arc::new(StrategyResolver::new(AuthConfig::default())),
            ContextFactory::default(),
            &config,
        )
        .unwrap()
    }

    const ROUTES: &str = "MCP users Users.list description=Users\n\
                          TOOL create_user Users.create required=email\n\
                          TOOL fail Users.fail\n\
                          TOOL admin_only Users.list auth=role:admin\n";

    async fn call(d: &RpcDispatcher, body: &str) -> RpcReply {
        let (parts, _) = Request::post("/_mcp").body(Body::empty()).unwrap().into_parts();
        d.dispatch(&parts, Bytes::from(body.to_string())).await
    }

    fn value(reply: RpcReply) -> Value {
        match reply {
            RpcReply::Response(response) => response.to_value(),
            RpcReply::Accepted => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_resource_and_tool_calls() {
        let d = dispatcher(ROUTES, McpConfig::default());

        let reply = call(&d, r#"{"jsonrpc":"2.0","id":1,"method":"users/list"}"#).await;
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(value(reply)["result"]["users"][1], "grace");

        let reply = call(
            &d,
            r#"{"jsonrpc":"2.0","id":"c1","method":"create_user","params":{"email":"a@b.c"}}"#,
        )
        .await;
        let v = value(reply);
        assert_eq!(v["id"], "c1");
        assert_eq!(v["result"]["created"], "a@b.c");
    }

    #[tokio::test]
    async fn test_unknown_method_echoes_id() {
        let d = dispatcher(ROUTES, McpConfig::default());
        let reply = call(&d, r#"{"jsonrpc":"2.0","id":42,"method":"nope"}"#).await;
        assert_eq!(reply.status(), StatusCode::OK);
        let v = value(reply);
        assert_eq!(v["error"]["code"], -32601);
        assert_eq!(v["id"], 42);
        assert!(v.get("result").is_none());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let d = dispatcher(ROUTES, McpConfig::default());
        let reply = call(&d, "{oops").await;
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
        let v = value(reply);
        assert_eq!(v["error"]["code"], -32600);
        assert_eq!(v["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_missing_required_args() {
        let d = dispatcher(ROUTES, McpConfig::default());
        let reply = call(&d, r#"{"jsonrpc":"2.0","id":2,"method":"create_user","params":{}}"#).await;
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
        let v = value(reply);
        assert_eq!(v["error"]["code"], -32600);
        assert_eq!(v["error"]["data"]["missing"][0], "email");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let d = dispatcher(ROUTES, McpConfig::default());
        let reply = call(&d, r#"{"jsonrpc":"2.0","id":3,"method":"fail"}"#).await;
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let v = value(reply);
        assert_eq!(v["error"]["code"], -32603);
        assert_eq!(v["error"]["message"], "Internal error");
        assert!(!v.to_string().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_route_auth_failure() {
        let d = dispatcher(ROUTES, McpConfig::default());
        let reply = call(&d, r#"{"jsonrpc":"2.0","id":4,"method":"admin_only"}"#).await;
        assert_eq!(reply.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(value(reply)["error"]["code"], -32003);
    }

    #[tokio::test]
    async fn test_notification_is_accepted() {
        let d = dispatcher(ROUTES, McpConfig::default());
        let reply = call(&d, r#"{"jsonrpc":"2.0","method":"users/list"}"#).await;
        assert_eq!(reply, RpcReply::Accepted);
        assert_eq!(reply.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_initialize_and_token_guard() {
        let config = McpConfig {
            auth_token: Some("t0k".into()),
            allow_unauthenticated_initialize: true,
            ..McpConfig::default()
        };
        let d = dispatcher(ROUTES, config);

        let v = value(call(&d, r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#).await);
        assert_eq!(v["result"]["resources"].as_array().unwrap().len(), 1);
        assert_eq!(v["result"]["tools"].as_array().unwrap().len(), 3);

        let reply = call(&d, r#"{"jsonrpc":"2.0","id":2,"method":"users/list"}"#).await;
        assert_eq!(reply.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(value(reply)["error"]["code"], -32000);
    }
}
