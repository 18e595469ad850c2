//! Double-submit CSRF protection.
//!
//! Unsafe methods must echo the CSRF cookie in the CSRF header. Exempt:
//! safe methods, the RPC endpoint (token-guarded instead), configured
//! exempt path patterns, and routes declaring `csrf=false`.

use std::sync::Arc;

use axum::http::Method;
use axum::response::IntoResponse;

use crate::config::SecurityConfig;
use crate::error::HttpError;
use crate::http::endpoint::Endpoint;
use crate::http::middleware::{Middleware, MiddlewareArgs};
use crate::http::request::cookie_value;
use crate::routing::{MatchResult, PathPattern, Router};

pub struct CsrfProtection {
    router: Arc<Router>,
    rpc_endpoint: Option<String>,
}

impl CsrfProtection {
    pub const ID: &'static str = "csrf";

    pub fn new(router: Arc<Router>, rpc_endpoint: Option<String>) -> Self {
        Self { router, rpc_endpoint }
    }
}

impl Middleware for CsrfProtection {
    fn id(&self) -> &str {
        Self::ID
    }

    fn security_aware(&self) -> bool {
        true
    }

    fn wrap(&self, next: Endpoint, args: MiddlewareArgs<'_>) -> Endpoint {
        let Some(security) = args.security.filter(|s| s.csrf_enabled) else {
            return next;
        };
        let exempt: Arc<Vec<PathPattern>> = Arc::new(
            security
                .csrf_exempt_paths
                .iter()
                .map(|p| PathPattern::parse(p))
                .collect(),
        );
        let router = self.router.clone();
        let rpc_endpoint = self.rpc_endpoint.clone();

        Endpoint::new(move |req| {
            let next = next.clone();
            let verdict = check(&security, &router, rpc_endpoint.as_deref(), &exempt, &req);
            async move {
                match verdict {
                    Ok(()) => next.call(req).await,
                    Err(err) => {
                        err.log();
                        err.into_response()
                    }
                }
            }
        })
    }
}

fn check<B>(
    security: &SecurityConfig,
    router: &Router,
    rpc_endpoint: Option<&str>,
    exempt: &[PathPattern],
    req: &axum::http::Request<B>,
) -> Result<(), HttpError> {
    let method = req.method();
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE) {
        return Ok(());
    }

    let path = req.uri().path();
    if rpc_endpoint == Some(path) || exempt.iter().any(|p| p.matches(path).is_some()) {
        return Ok(());
    }
    if let MatchResult::Matched(m) = router.match_route(method, path) {
        if m.route.csrf_exempt() {
            return Ok(());
        }
    }

    let cookie = cookie_value(req.headers(), &security.csrf_cookie);
    let header = req
        .headers()
        .get(security.csrf_header.as_str())
        .and_then(|v| v.to_str().ok());

    match (cookie.as_deref(), header) {
        (Some(cookie), Some(header)) if !cookie.is_empty() && cookie == header => Ok(()),
        _ => Err(HttpError::Forbidden("Invalid or missing CSRF token".to_string())),
    }
}
