//! Response rendering for web routes.
//!
//! # Responsibilities
//! - Pick a representation from the route's `response_type` option
//! - Auto-detect it from the tagged handler output otherwise
//! - Serialize JSON, issue redirects, render views, pass raw responses through
//!
//! # Auto detection order
//! ```text
//! 1. Raw response already typed application/json → Json
//! 2. Redirect(path) non-empty, or Text starting with '/' → Redirect
//! 3. Json(object) → Json
//! 4. View → View
//! 5. anything else → Default
//! ```

use std::fmt;
use std::str::FromStr;

use axum::body::Body;
use axum::http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::handlers::HandlerOutput;
use crate::routing::RouteDefinition;

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Json,
    Redirect,
    View,
    Default,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown response_type '{0}' (expected json, redirect, view, default or auto)")]
pub struct UnknownResponseKind(pub String);

impl FromStr for ResponseKind {
    type Err = UnknownResponseKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ResponseKind::Json),
            "redirect" => Ok(ResponseKind::Redirect),
            "view" | "html" => Ok(ResponseKind::View),
            "default" => Ok(ResponseKind::Default),
            "auto" => Ok(ResponseKind::Auto),
            other => Err(UnknownResponseKind(other.to_string())),
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseKind::Json => "json",
            ResponseKind::Redirect => "redirect",
            ResponseKind::View => "view",
            ResponseKind::Default => "default",
            ResponseKind::Auto => "auto",
        };
        f.write_str(name)
    }
}

impl ResponseKind {
    /// The route's declared kind; undeclared or unknown means `Auto`.
    pub fn for_route(route: &RouteDefinition) -> Self {
        route
            .response_type()
            .and_then(|s| s.parse().ok())
            .unwrap_or(ResponseKind::Auto)
    }

    /// Resolve `Auto` against a handler output.
    pub fn detect(output: &HandlerOutput) -> Self {
        match output {
            HandlerOutput::Raw(draft) if draft.is_json() => ResponseKind::Json,
            HandlerOutput::Redirect(path) if !path.is_empty() => ResponseKind::Redirect,
            HandlerOutput::Text(text) if text.starts_with('/') => ResponseKind::Redirect,
            HandlerOutput::Json(Value::Object(_)) => ResponseKind::Json,
            HandlerOutput::View(_) => ResponseKind::View,
            _ => ResponseKind::Default,
        }
    }
}

/// Render `output` as `kind`. `redirect_override` is the route-level
/// `redirect_to` and wins over anything the handler returned.
pub fn render(kind: ResponseKind, output: HandlerOutput, redirect_override: Option<&str>) -> Response {
    match kind {
        ResponseKind::Auto => {
            let detected = ResponseKind::detect(&output);
            render(detected, output, redirect_override)
        }
        ResponseKind::Json => render_json(output),
        ResponseKind::Redirect => render_redirect(&output, redirect_override),
        ResponseKind::View => render_view(output),
        ResponseKind::Default => render_default(output, redirect_override),
    }
}

fn render_json(output: HandlerOutput) -> Response {
    match output {
        HandlerOutput::Raw(draft) if draft.is_json() => draft.into_response(),
        HandlerOutput::Raw(draft) => {
            let status = draft.status;
            (status, Json(HandlerOutput::Raw(draft).into_json())).into_response()
        }
        other => Json(other.into_json()).into_response(),
    }
}

/// Target priority: override → handler redirect → string result → `/`.
pub fn redirect_target<'a>(output: &'a HandlerOutput, redirect_override: Option<&'a str>) -> &'a str {
    redirect_override
        .filter(|p| !p.is_empty())
        .or_else(|| output.redirect_path())
        .or(match output {
            HandlerOutput::Text(text) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .unwrap_or("/")
}

fn render_redirect(output: &HandlerOutput, redirect_override: Option<&str>) -> Response {
    redirect(redirect_target(output, redirect_override))
}

/// `302 Found` to `target`; an unencodable target falls back to `/`.
pub fn redirect(target: &str) -> Response {
    let location = HeaderValue::from_str(target).unwrap_or_else(|_| HeaderValue::from_static("/"));
    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(LOCATION, location);
    response
}

fn render_view(output: HandlerOutput) -> Response {
    let body = match output {
        HandlerOutput::Raw(mut draft) => {
            if !draft.headers.contains_key(CONTENT_TYPE) {
                draft.headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML));
            }
            return draft.into_response();
        }
        HandlerOutput::View(view) => view.render(),
        HandlerOutput::Text(text) | HandlerOutput::Redirect(text) => text,
        HandlerOutput::Json(Value::String(text)) => text,
        HandlerOutput::Json(value) => value.to_string(),
        HandlerOutput::Empty => String::new(),
    };
    with_content_type(StatusCode::OK, body, HTML)
}

fn render_default(output: HandlerOutput, redirect_override: Option<&str>) -> Response {
    match output {
        HandlerOutput::Raw(draft) => draft.into_response(),
        HandlerOutput::Empty => StatusCode::OK.into_response(),
        HandlerOutput::Text(text) => with_content_type(StatusCode::OK, text, TEXT),
        HandlerOutput::Json(value) => Json(value).into_response(),
        redirect @ HandlerOutput::Redirect(_) => render_redirect(&redirect, redirect_override),
        view @ HandlerOutput::View(_) => render_view(view),
    }
}

fn with_content_type(status: StatusCode, body: String, content_type: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
