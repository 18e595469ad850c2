//! What a handler hands back.
//!
//! Handlers tag their result themselves; the response layer never inspects a
//! value for capabilities.

use std::fmt;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};

/// A view object that knows how to render itself to HTML.
pub trait Renderable: Send + Sync {
    fn render(&self) -> String;
}

/// A template-free view over a fixed string.
#[derive(Debug, Clone)]
pub struct Html(pub String);

impl Renderable for Html {
    fn render(&self) -> String {
        self.0.clone()
    }
}

/// A response the handler has already populated.
#[derive(Debug, Clone)]
pub struct ResponseDraft {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for ResponseDraft {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl ResponseDraft {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: axum::http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with `application/json`.
    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self::new(status)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(value.to_string())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.starts_with("application/json"))
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// A handler result, tagged by the handler.
#[derive(Clone, Default)]
pub enum HandlerOutput {
    /// No result.
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Redirect(String),
    View(Arc<dyn Renderable>),
    Raw(ResponseDraft),
}

impl HandlerOutput {
    pub fn json(value: impl Into<Value>) -> Self {
        HandlerOutput::Json(value.into())
    }

    pub fn view(view: impl Renderable + 'static) -> Self {
        HandlerOutput::View(Arc::new(view))
    }

    /// JSON form of the result: objects as-is, nothing as
    /// `{"success": true}`, anything else under `data`.
    pub fn into_json(self) -> Value {
        let data = match self {
            HandlerOutput::Empty | HandlerOutput::Json(Value::Null) => return json!({ "success": true }),
            HandlerOutput::Json(Value::Object(map)) => return Value::Object(map),
            HandlerOutput::Json(value) => value,
            HandlerOutput::Text(text) => Value::String(text),
            HandlerOutput::Redirect(path) => return json!({ "success": true, "redirect_to": path }),
            HandlerOutput::View(view) => Value::String(view.render()),
            HandlerOutput::Raw(draft) => serde_json::from_slice(&draft.body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&draft.body).into_owned())),
        };
        json!({ "success": true, "data": data })
    }

    /// Non-empty redirect target carried by this output, if any.
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            HandlerOutput::Redirect(path) if !path.is_empty() => Some(path),
            _ => None,
        }
    }
}

impl fmt::Debug for HandlerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerOutput::Empty => f.write_str("Empty"),
            HandlerOutput::Json(v) => f.debug_tuple("Json").field(v).finish(),
            HandlerOutput::Text(s) => f.debug_tuple("Text").field(s).finish(),
            HandlerOutput::Redirect(p) => f.debug_tuple("Redirect").field(p).finish(),
            HandlerOutput::View(_) => f.write_str("View(..)"),
            HandlerOutput::Raw(d) => f.debug_tuple("Raw").field(&d.status).finish(),
        }
    }
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => HandlerOutput::Empty,
            other => HandlerOutput::Json(other),
        }
    }
}

impl From<String> for HandlerOutput {
    fn from(text: String) -> Self {
        HandlerOutput::Text(text)
    }
}

impl From<&str> for HandlerOutput {
    fn from(text: &str) -> Self {
        HandlerOutput::Text(text.to_string())
    }
}
