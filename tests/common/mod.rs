//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use waypoint::config::AppConfig;
use waypoint::handlers::{HandlerContext, HandlerError, HandlerOutput, HandlerRegistry, Html};
use waypoint::session::{InMemorySessionStore, Session};
use waypoint::{Application, HttpServer, RouteTable, Shutdown};

pub const ROUTES: &str = r#"
# Web routes
GET    /                   Pages#home
GET    /health             System#health response_type=json
GET    /users/:id          Users#show response_type=json
POST   /users              Users#create response_type=json auth=session
GET    /dashboard          Pages#dashboard auth=session
GET    /admin              Pages#admin auth=role:admin response_type=json
GET    /admin/page         Pages#admin auth=role:admin
GET    /reports            Pages#reports auth=permission:reports.read response_type=json
GET    /keys               Pages#whoami auth=api_key response_type=json
GET    /whoami             Pages#whoami auth=session response_type=json
GET    /go                 Pages#go
POST   /logout             Pages#logout redirect_to=/goodbye
GET    /boom               Pages#boom
GET    /broken             Pages#broken
GET    /missing-user       Pages#missing response_type=json
GET    404                 Errors#not_found
GET    500                 Errors#internal

# RPC
MCP    users               Users.mcp_list description="List all users"
MCP    users               Users.mcp_get action=get
TOOL   create_user         Users.mcp_create description="Create a user" params=email:string,name:string required=email
TOOL   explode             Users.mcp_explode
TOOL   admin_tool          Users.mcp_list auth=role:admin
"#;

pub fn registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register("Pages#home", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::view(Html("<h1>home</h1>".into())))
        })
        .register("Pages#dashboard", |ctx: HandlerContext| async move {
            let name = ctx.auth.user_name().unwrap_or_default();
            Ok::<_, HandlerError>(HandlerOutput::Text(format!("dashboard for {name}")))
        })
        .register("Pages#admin", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"admin": true})))
        })
        .register("Pages#reports", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::Empty)
        })
        .register("Pages#whoami", |ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::json(json!({
                "user_id": ctx.auth.user_id(),
                "auth_method": ctx.auth.auth_method(),
            })))
        })
        .register("Pages#go", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::Redirect("/elsewhere".into()))
        })
        .register("Pages#logout", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::Redirect("/".into()))
        })
        .register("Pages#boom", |_ctx: HandlerContext| async move {
            if true {
                panic!("database exploded at 10.0.0.5");
            }
            Ok::<_, HandlerError>(HandlerOutput::Empty)
        })
        .register("Pages#broken", |_ctx: HandlerContext| async move {
            Err::<HandlerOutput, _>(HandlerError::internal("pool exhausted"))
        })
        .register("Pages#missing", |_ctx: HandlerContext| async move {
            Err::<HandlerOutput, _>(HandlerError::NotFound("No such user".into()))
        })
        .register("Users#show", |ctx: HandlerContext| async move {
            let id = ctx.path_param("id").unwrap_or_default().to_string();
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"id": id, "page": ctx.arg("page")})))
        })
        .register("Users#create", |ctx: HandlerContext| async move {
            let email = ctx
                .arg_str("email")
                .ok_or_else(|| HandlerError::BadRequest("email is required".into()))?
                .to_string();
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"created": email})))
        })
        .register("Errors#not_found", |ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::Text(format!("nothing at {}", ctx.request.path())))
        })
        .register("Errors#internal", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::Text("something went wrong".into()))
        })
        .register("Users.mcp_list", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"users": ["ada", "grace"]})))
        })
        .register("Users.mcp_get", |_ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"user": "ada"})))
        })
        .register("Users.mcp_create", |ctx: HandlerContext| async move {
            Ok::<_, HandlerError>(HandlerOutput::json(json!({"created": ctx.arg_str("email")})))
        })
        .register("Users.mcp_explode", |_ctx: HandlerContext| async move {
            if true {
                panic!("secret connection string");
            }
            Ok::<_, HandlerError>(HandlerOutput::Empty)
        });
    registry
}

/// Sessions: `admin` (roles admin+editor), `editor` (role editor,
/// permission reports.read), `anon` (no user id).
pub fn sessions() -> Arc<InMemorySessionStore> {
    let store = InMemorySessionStore::new();
    store.insert("admin", session("u-admin", "Ada", &["admin", "editor"], &[]));
    store.insert("editor", session("u-editor", "Grace", &["editor"], &["reports.read"]));
    store.insert("anon", Session::new());
    Arc::new(store)
}

pub fn session(user_id: &str, name: &str, roles: &[&str], permissions: &[&str]) -> Session {
    let mut session = Session::new();
    session.insert("user_id", json!(user_id));
    session.insert("user_name", json!(name));
    session.insert("roles", json!(roles));
    session.insert("permissions", json!(permissions));
    session
}

pub fn application(config: AppConfig) -> Application {
    Application::new(config, RouteTable::parse(ROUTES).expect("routes parse"))
        .with_handlers(registry())
        .with_system_handlers()
        .with_session_store(sessions())
}

/// The fully layered axum router for `config`.
pub fn router(config: AppConfig) -> axum::Router {
    let endpoint = application(config.clone()).build().expect("application builds");
    HttpServer::new(endpoint, config).router()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub async fn send(router: &axum::Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.expect("infallible");
    let (parts, body) = response.into_parts();
    TestResponse {
        status: parts.status,
        headers: parts.headers,
        body: to_bytes(body, usize::MAX).await.expect("body"),
    }
}

pub fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

pub fn get_with_session(path: &str, session_id: &str) -> Request<Body> {
    Request::get(path)
        .header("cookie", format!("waypoint_session={session_id}"))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn rpc_request(body: impl Into<Body>) -> Request<Body> {
    Request::post("/_mcp")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

/// Bind `config`'s application on an ephemeral port.
pub async fn start_server(config: AppConfig) -> (SocketAddr, Shutdown) {
    let endpoint = application(config.clone()).build().expect("application builds");
    let server = HttpServer::new(endpoint, config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.wait();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}
