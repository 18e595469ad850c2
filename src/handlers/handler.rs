//! The handler capability and its per-call inputs.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::{RequestContext, StrategyResult};
use crate::handlers::output::HandlerOutput;
use crate::rpc::ErrorCode;
use crate::routing::RouteDefinition;

pub type HandlerFuture = BoxFuture<'static, Result<HandlerOutput, HandlerError>>;

/// Everything a handler receives for one invocation.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub request: Arc<RequestContext>,
    pub auth: StrategyResult,
    /// Merged request params for web routes, the envelope `params` for
    /// tools, empty for resources.
    pub args: Map<String, Value>,
    pub route: Arc<RouteDefinition>,
}

impl HandlerContext {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name).filter(|v| !v.is_null())
    }

    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Value::as_str)
    }

    /// A path parameter bound by the router.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.request.path_params().get(name).map(String::as_str)
    }
}

/// Errors a handler may return. Only the message of client-facing variants
/// ever reaches the response; `Internal` detail is logged and replaced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn rpc_code(&self) -> ErrorCode {
        match self {
            HandlerError::BadRequest(_) => ErrorCode::InvalidRequest,
            HandlerError::InvalidParams(_) | HandlerError::NotFound(_) => ErrorCode::InvalidParams,
            HandlerError::Forbidden(_) => ErrorCode::Forbidden,
            HandlerError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Message safe to send to the client.
    pub fn public_message(&self) -> &str {
        match self {
            HandlerError::BadRequest(m)
            | HandlerError::InvalidParams(m)
            | HandlerError::Forbidden(m)
            | HandlerError::NotFound(m) => m,
            HandlerError::Internal(_) => "Internal error",
        }
    }
}

/// A route, resource or tool implementation.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: HandlerContext) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerOutput, HandlerError>> + Send + 'static,
{
    fn call(&self, ctx: HandlerContext) -> HandlerFuture {
        self(ctx).boxed()
    }
}

/// Run a handler, turning a panic into [`HandlerError::Internal`].
pub async fn invoke(handler: Arc<dyn Handler>, ctx: HandlerContext) -> Result<HandlerOutput, HandlerError> {
    let label = ctx.route.handler.key();
    match AssertUnwindSafe(handler.call(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(handler = %label, panic = %detail, "Handler panicked");
            Err(HandlerError::Internal(format!("handler {label} panicked: {detail}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteTable;
    use axum::http::Method;
    use serde_json::json;

    fn context() -> HandlerContext {
        let table = RouteTable::parse("GET /boom Boom#run\n").unwrap();
        let ctx = HandlerContext {
            request: Arc::new(RequestContext::new(Method::GET, "/boom")),
            auth: StrategyResult::anonymous(Map::new()),
            args: Map::new(),
            route: table.iter().next().unwrap().clone(),
        };
        ctx
    }

    #[tokio::test]
    async fn test_invoke_catches_panics() {
        let handler: Arc<dyn Handler> = Arc::new(|_ctx: HandlerContext| async move {
            if true {
                panic!("kaboom");
            }
            Ok::<_, HandlerError>(HandlerOutput::Empty)
        });
        let err = invoke(handler, context()).await.unwrap_err();
        assert!(matches!(err, HandlerError::Internal(ref m) if m.contains("kaboom")));
        assert_eq!(err.public_message(), "Internal error");
    }

    #[tokio::test]
    async fn test_invoke_passes_results_through() {
        let handler: Arc<dyn Handler> =
            Arc::new(|ctx: HandlerContext| async move {
                Ok::<_, HandlerError>(HandlerOutput::json(json!({"path": ctx.request.path()})))
            });
        let output = invoke(handler, context()).await.unwrap();
        assert_eq!(output.into_json(), json!({"path": "/boom"}));
    }

    #[test]
    fn test_internal_detail_is_not_public() {
        let err = HandlerError::internal("db password rejected");
        assert_eq!(err.public_message(), "Internal error");
        assert_eq!(err.rpc_code(), ErrorCode::InternalError);
        assert!(err.to_string().contains("db password"));
    }

    #[test]
    fn test_client_errors_map_to_rpc_codes() {
        assert_eq!(HandlerError::BadRequest("x".into()).rpc_code(), ErrorCode::InvalidRequest);
        assert_eq!(HandlerError::InvalidParams("x".into()).rpc_code(), ErrorCode::InvalidParams);
        assert_eq!(HandlerError::Forbidden("x".into()).rpc_code(), ErrorCode::Forbidden);
        assert_eq!(HandlerError::NotFound("no user 7".into()).public_message(), "no user 7");
    }
}
