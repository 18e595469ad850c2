//! The base application and its builder.
//!
//! # Data Flow
//! ```text
//! Request (after the middleware stack)
//!     → RPC endpoint?  → RpcDispatcher (POST only)
//!     → Router::match_route → 404 fallback route on NotFound
//!     → body read (limits) + decoded (request::parse_body)
//!     → ContextFactory → StrategyResolver (401 / 403 / login redirect)
//!     → handler (panics caught) → 500 fallback route on Internal
//!     → response::render
//! ```
//!
//! # Design Decisions
//! - Everything a route table can get wrong is checked in `build`, so a
//!   running server never meets an unknown strategy or handler
//! - Built-in middleware order: security headers, rate limit, session,
//!   CSRF, then caller-registered middleware

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use crate::auth::{
    AuthFailure, AuthRequirement, ContextFactory, FailureKind, GeoResolver, RequestContext, StrategyKind,
    StrategyResolver, StrategyResult,
};
use crate::config::AppConfig;
use crate::error::{HttpError, StartupError};
use crate::handlers::{invoke, system, HandlerContext, HandlerError, HandlerRegistry};
use crate::http::endpoint::Endpoint;
use crate::http::middleware::{Middleware, MiddlewareStack};
use crate::http::request::{parse_body, request_id};
use crate::http::response::{redirect, render, ResponseKind};
use crate::observability::metrics;
use crate::routing::{MatchResult, PathParams, RouteDefinition, RouteMatch, RouteTable, Router};
use crate::rpc::RpcDispatcher;
use crate::security::{read_limited, CsrfProtection, InMemoryBackend, RateLimit, RateLimitBackend, SecurityHeaders};
use crate::session::{SessionLoader, SessionStore};

/// Collects configuration, routes, handlers and collaborators, then builds
/// the request pipeline.
pub struct Application {
    config: AppConfig,
    table: Arc<RouteTable>,
    handlers: HandlerRegistry,
    sessions: Option<Arc<dyn SessionStore>>,
    geo: Option<Arc<dyn GeoResolver>>,
    rate_limit_backend: Option<Arc<dyn RateLimitBackend>>,
    extra: MiddlewareStack,
}

impl Application {
    pub fn new(config: AppConfig, table: RouteTable) -> Self {
        Self {
            config,
            table: Arc::new(table),
            handlers: HandlerRegistry::new(),
            sessions: None,
            geo: None,
            rate_limit_backend: None,
            extra: MiddlewareStack::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Register the built-in `System` handlers against this route table.
    pub fn with_system_handlers(mut self) -> Self {
        system::register(&mut self.handlers, self.table.clone());
        self
    }

    /// Enables the session-loading middleware.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    pub fn with_geo_resolver(mut self, geo: Arc<dyn GeoResolver>) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn with_rate_limit_backend(mut self, backend: Arc<dyn RateLimitBackend>) -> Self {
        self.rate_limit_backend = Some(backend);
        self
    }

    /// Append a middleware after the built-in ones.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>, args: Vec<Value>, options: Map<String, Value>) -> Self {
        self.extra.add(middleware, args, options);
        self
    }

    /// Check the route table against registered handlers and known options.
    pub fn validate(&self) -> Result<(), StartupError> {
        let missing = self.handlers.missing_for(&self.table);
        if !missing.is_empty() {
            return Err(StartupError::MissingHandlers(missing));
        }

        let problems: Vec<String> = self
            .table
            .iter()
            .flat_map(|route| route_problems(route, &self.config))
            .collect();
        if !problems.is_empty() {
            return Err(StartupError::InvalidRoutes(problems));
        }
        Ok(())
    }

    /// The middleware stack `build` wraps around the base application.
    pub fn middleware(&self, router: &Arc<Router>) -> MiddlewareStack {
        let mut stack = MiddlewareStack::new();
        stack.push(Arc::new(SecurityHeaders));

        if self.config.rate_limit.enabled {
            let backend: Arc<dyn RateLimitBackend> = match &self.rate_limit_backend {
                Some(backend) => backend.clone(),
                None => Arc::new(InMemoryBackend::new()),
            };
            stack.push(Arc::new(RateLimit::new(backend, self.config.rate_limit.clone())));
        }
        if let Some(store) = &self.sessions {
            stack.push(Arc::new(SessionLoader::new(
                store.clone(),
                self.config.session.cookie_name.clone(),
            )));
        }
        if self.config.security.csrf_enabled {
            stack.push(Arc::new(CsrfProtection::new(router.clone(), self.rpc_endpoint())));
        }

        for entry in self.extra.entries() {
            stack.add(entry.middleware.clone(), entry.args.clone(), entry.options.clone());
        }
        stack
    }

    fn rpc_endpoint(&self) -> Option<String> {
        self.config.mcp.enabled.then(|| self.config.mcp.endpoint.clone())
    }

    /// Validate and assemble the full pipeline.
    pub fn build(self) -> Result<Endpoint, StartupError> {
        self.validate()?;

        let router = Arc::new(Router::new(self.table.as_ref().clone()));
        let handlers = Arc::new(self.handlers.clone());
        let resolver = Arc::new(StrategyResolver::new(self.config.auth.clone()));
        let contexts = ContextFactory::new(self.geo.clone(), self.config.security.trust_forwarded_headers);

        let rpc = match self.rpc_endpoint() {
            Some(endpoint) => {
                let dispatcher = RpcDispatcher::new(
                    &self.table,
                    handlers.clone(),
                    resolver.clone(),
                    contexts.clone(),
                    &self.config.mcp,
                )?;
                Some((endpoint, Arc::new(dispatcher)))
            }
            None => None,
        };

        let pipeline = Arc::new(Pipeline {
            router: router.clone(),
            handlers,
            resolver,
            contexts,
            rpc,
            max_body_size: self.config.security.max_body_size,
            login_path: self.config.auth.login_path.clone(),
        });

        let base = Endpoint::new(move |req| pipeline.clone().handle(req));
        let stack = self.middleware(&router);
        tracing::info!(
            routes = self.table.len(),
            handlers = self.handlers.len(),
            middleware = ?stack.ids(),
            "Application built"
        );
        Ok(stack.build_app(base, Arc::new(self.config.security.clone())))
    }
}

fn route_problems(route: &RouteDefinition, config: &AppConfig) -> Vec<String> {
    let mut problems = Vec::new();
    let at = |msg: String| format!("line {} ({}): {}", route.line, route.label(), msg);

    if let Some(raw) = route.auth_requirement() {
        match AuthRequirement::parse(raw) {
            Ok(req) if req.kind == StrategyKind::Role && req.argument.is_none() && config.auth.allowed_roles.is_empty() => {
                problems.push(at("bare 'role' requires auth.allowed_roles".to_string()));
            }
            Ok(_) => {}
            Err(e) => problems.push(at(e.to_string())),
        }
    }
    if let Some(raw) = route.response_type() {
        if let Err(e) = raw.parse::<ResponseKind>() {
            problems.push(at(e.to_string()));
        }
    }
    problems
}

struct Pipeline {
    router: Arc<Router>,
    handlers: Arc<HandlerRegistry>,
    resolver: Arc<StrategyResolver>,
    contexts: ContextFactory,
    rpc: Option<(String, Arc<RpcDispatcher>)>,
    max_body_size: usize,
    login_path: String,
}

impl Pipeline {
    async fn handle(self: Arc<Self>, req: Request<Body>) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let request_id = request_id(&req);

        let (response, label) = self.route(req).await;

        let status = response.status().as_u16();
        metrics::record_request(method.as_str(), status, &label, start);
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            route = %label,
            status,
            "Request handled"
        );
        response
    }

    async fn route(&self, req: Request<Body>) -> (Response, String) {
        if let Some((endpoint, dispatcher)) = &self.rpc {
            if req.uri().path() == endpoint.as_str() {
                return (self.serve_rpc(dispatcher, req).await, "rpc".to_string());
            }
        }

        match self.router.match_route(req.method(), req.uri().path()) {
            MatchResult::Matched(matched) => {
                let label = matched.route.label();
                (self.serve_route(matched, req).await, label)
            }
            MatchResult::NotFound => (self.not_found(req).await, "none".to_string()),
        }
    }

    async fn serve_rpc(&self, dispatcher: &RpcDispatcher, req: Request<Body>) -> Response {
        if req.method() != Method::POST {
            let body = json!({
                "error": "Method Not Allowed",
                "message": "The RPC endpoint only accepts POST",
            });
            return (StatusCode::METHOD_NOT_ALLOWED, [(ALLOW, "POST")], Json(body)).into_response();
        }

        let (parts, body) = req.into_parts();
        match read_limited(&parts.headers, body, self.max_body_size).await {
            Ok(bytes) => dispatcher.dispatch(&parts, bytes).await.into_response(),
            Err(err) => {
                err.log();
                err.into_response()
            }
        }
    }

    async fn serve_route(&self, matched: RouteMatch, req: Request<Body>) -> Response {
        let RouteMatch { route, params } = matched;
        let (parts, body) = req.into_parts();

        let decoded = match read_limited(&parts.headers, body, self.max_body_size).await {
            Ok(bytes) => parse_body(&parts.headers, &bytes),
            Err(err) => Err(err),
        };
        let body = match decoded {
            Ok(body) => body,
            Err(err) => {
                err.log();
                return err.into_response();
            }
        };

        let context = Arc::new(self.contexts.build(&parts, body, params));
        let auth = match self.resolver.resolve(&context, route.auth_requirement()) {
            Ok(auth) => auth,
            Err(failure) => return self.auth_failure(&route, &failure),
        };

        let Some(handler) = self.handlers.get(&route.handler) else {
            return HttpError::Internal(format!("no handler registered for {}", route.handler)).into_response();
        };
        let ctx = HandlerContext {
            args: context.params(),
            request: context.clone(),
            auth,
            route: route.clone(),
        };

        match invoke(handler, ctx).await {
            Ok(output) => render(ResponseKind::for_route(&route), output, route.option("redirect_to")),
            Err(err) => self.handler_failure(&route, err, context).await,
        }
    }

    fn auth_failure(&self, route: &RouteDefinition, failure: &AuthFailure) -> Response {
        let status = failure.status();
        metrics::record_auth_failure(failure.auth_method(), status.as_u16());
        tracing::debug!(
            route = %route.label(),
            strategy = failure.auth_method(),
            status = status.as_u16(),
            "Rendering authentication failure"
        );

        let json_route = ResponseKind::for_route(route) == ResponseKind::Json;
        match (failure.kind(), json_route) {
            (FailureKind::MissingIdentity, true) => {
                HttpError::Unauthorized(failure.failure_reason().to_string()).into_response()
            }
            (FailureKind::InsufficientPrivilege, true) => {
                HttpError::Forbidden(failure.failure_reason().to_string()).into_response()
            }
            (FailureKind::MissingIdentity, false) => redirect(&self.login_path),
            (FailureKind::InsufficientPrivilege, false) => (
                status,
                [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
                failure.failure_reason().to_string(),
            )
                .into_response(),
        }
    }

    async fn handler_failure(
        &self,
        route: &RouteDefinition,
        err: HandlerError,
        context: Arc<RequestContext>,
    ) -> Response {
        let http = match err {
            HandlerError::BadRequest(m) | HandlerError::InvalidParams(m) => HttpError::BadRequest(m),
            HandlerError::Forbidden(m) => HttpError::Forbidden(m),
            HandlerError::NotFound(m) => HttpError::NotFound(m),
            HandlerError::Internal(detail) => {
                tracing::error!(handler = %route.handler, route = %route.label(), error = %detail, "Handler failed");
                if let Some(response) = self.fallback(StatusCode::INTERNAL_SERVER_ERROR, context).await {
                    return response;
                }
                HttpError::Internal(detail)
            }
        };
        http.log();
        http.into_response()
    }

    async fn not_found(&self, req: Request<Body>) -> Response {
        let (parts, _) = req.into_parts();
        let context = Arc::new(self.contexts.build(&parts, Map::new(), PathParams::new()));
        if let Some(response) = self.fallback(StatusCode::NOT_FOUND, context).await {
            return response;
        }
        let err = HttpError::NotFound(format!("No route matches {} {}", parts.method, parts.uri.path()));
        err.log();
        err.into_response()
    }

    /// Serve the fallback route for `status`, if one is declared and
    /// succeeds. A plain 200 from the handler is replaced by `status`.
    async fn fallback(&self, status: StatusCode, context: Arc<RequestContext>) -> Option<Response> {
        let route = self.router.fallback(status.as_u16())?;
        let handler = self.handlers.get(&route.handler)?;

        let ctx = HandlerContext {
            args: context.params(),
            auth: StrategyResult::anonymous(context.client_metadata()),
            request: context,
            route: route.clone(),
        };
        match invoke(handler, ctx).await {
            Ok(output) => {
                let mut response = render(ResponseKind::for_route(&route), output, route.option("redirect_to"));
                if response.status() == StatusCode::OK {
                    *response.status_mut() = status;
                }
                Some(response)
            }
            Err(err) => {
                tracing::error!(handler = %route.handler, error = %err, "Fallback handler failed");
                None
            }
        }
    }
}
