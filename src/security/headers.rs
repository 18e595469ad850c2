//! Security response headers.
//!
//! # Responsibilities
//! - Add `x-content-type-options`, `x-frame-options`, `referrer-policy`
//!
//! # Design Decisions
//! - Headers the handler already set are left alone
//! - Switched off entirely by `security.enable_headers = false`

use axum::http::header::{HeaderName, HeaderValue, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};

use crate::http::endpoint::Endpoint;
use crate::http::middleware::{Middleware, MiddlewareArgs};

const DEFAULTS: [(HeaderName, &str); 3] = [
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (X_FRAME_OPTIONS, "DENY"),
    (REFERRER_POLICY, "strict-origin-when-cross-origin"),
];

#[derive(Debug, Default)]
pub struct SecurityHeaders;

impl SecurityHeaders {
    pub const ID: &'static str = "security_headers";
}

impl Middleware for SecurityHeaders {
    fn id(&self) -> &str {
        Self::ID
    }

    fn security_aware(&self) -> bool {
        true
    }

    fn wrap(&self, next: Endpoint, args: MiddlewareArgs<'_>) -> Endpoint {
        let enabled = args.security.as_ref().map_or(true, |s| s.enable_headers);
        if !enabled {
            return next;
        }

        Endpoint::new(move |req| {
            let next = next.clone();
            async move {
                let mut response = next.call(req).await;
                let headers = response.headers_mut();
                for (name, value) in DEFAULTS {
                    if !headers.contains_key(&name) {
                        headers.insert(name, HeaderValue::from_static(value));
                    }
                }
                response
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::http::middleware::MiddlewareStack;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use std::sync::Arc;

    fn app(security: SecurityConfig) -> Endpoint {
        let base = Endpoint::new(|_req: Request<Body>| async {
            (StatusCode::OK, [(X_FRAME_OPTIONS, "SAMEORIGIN")], "ok").into_response()
        });
        let mut stack = MiddlewareStack::new();
        stack.push(Arc::new(SecurityHeaders));
        stack.build_app(base, Arc::new(security))
    }

    #[tokio::test]
    async fn test_headers_added_without_overwriting() {
        let response = app(SecurityConfig::default())
            .call(Request::get("/").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[X_FRAME_OPTIONS], "SAMEORIGIN");
        assert!(response.headers().contains_key(REFERRER_POLICY));
    }

    #[tokio::test]
    async fn test_disabled_by_config() {
        let security = SecurityConfig {
            enable_headers: false,
            ..SecurityConfig::default()
        };
        let response = app(security)
            .call(Request::get("/").body(Body::empty()).unwrap())
            .await;
        assert!(!response.headers().contains_key(X_CONTENT_TYPE_OPTIONS));
    }
}
