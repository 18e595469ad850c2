//! HTTP server setup.
//!
//! # Responsibilities
//! - Hand the built application to axum as the fallback service
//! - Wire up tower layers (request id, tracing, timeout, concurrency)
//! - Body size is capped by the application so the 413 stays JSON
//! - Serve plain TCP or rustls with graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::endpoint::Endpoint;
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(10);

pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    pub fn new(app: Endpoint, config: AppConfig) -> Self {
        let router = Self::build_router(&config, app);
        Self { router, config }
    }

    /// Build the axum router with all tower layers.
    fn build_router(config: &AppConfig, app: Endpoint) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id(req),
                )
            }))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections));

        Router::new().fallback_service(app.into_service()).layer(layers)
    }

    /// The layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` resolves.
    pub async fn run_tls<F>(self, addr: SocketAddr, tls: RustlsConfig, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown.await;
            drain.graceful_shutdown(Some(TLS_DRAIN));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls).handle(handle).serve(app).await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerContext, HandlerError, HandlerOutput};
    use crate::http::app::Application;
    use crate::routing::RouteTable;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn server() -> HttpServer {
        server_with(AppConfig::default())
    }

    fn server_with(config: AppConfig) -> HttpServer {
        let table = RouteTable::parse("GET /ping Ping#run response_type=json\n").unwrap();
        let mut app = Application::new(config.clone(), table);
        app.handlers_mut().register("Ping#run", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"pong": true})))
        });
        HttpServer::new(app.build().unwrap(), config)
    }

    #[tokio::test]
    async fn test_request_id_is_generated_and_propagated() {
        let response = server()
            .router()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[X_REQUEST_ID].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let response = server()
            .router()
            .oneshot(
                Request::get("/ping")
                    .header(X_REQUEST_ID, "trace-abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "trace-abc");
    }

    #[tokio::test]
    async fn test_oversized_body_gets_json_413() {
        let mut config = AppConfig::default();
        config.security.max_body_size = 16;
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string();

        let response = server_with(config)
            .router()
            .oneshot(
                Request::post("/_mcp")
                    .header("content-type", "application/json")
                    .header("content-length", body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()["content-type"], "application/json");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "Payload Too Large");
    }
}
