//! Per-request context seen by strategies and handlers.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};
use serde_json::{Map, Value};

use crate::auth::geo::GeoResolver;
use crate::http::request::client_ip;
use crate::routing::PathParams;
use crate::session::Session;

/// Everything a strategy or handler may read about the current request.
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Map<String, Value>,
    body: Map<String, Value>,
    path_params: PathParams,
    session: Option<Session>,
    client_ip: Option<IpAddr>,
    country: Option<String>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_path_params(mut self, params: PathParams) -> Self {
        self.path_params = params;
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_client(mut self, ip: Option<IpAddr>, country: Option<String>) -> Self {
        self.client_ip = ip;
        self.country = country;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Look up a parameter: path params, then query, then body.
    pub fn param(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.path_params.get(name) {
            return Some(Value::String(value.clone()));
        }
        self.query
            .get(name)
            .or_else(|| self.body.get(name))
            .filter(|v| !v.is_null())
            .cloned()
    }

    /// Body, then query, then path params merged into one map; later
    /// sources win on key clashes.
    pub fn params(&self) -> Map<String, Value> {
        let mut merged = self.body.clone();
        merged.extend(self.query.clone());
        merged.extend(
            self.path_params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone()))),
        );
        merged
    }

    /// Client IP and country as strategy metadata.
    pub fn client_metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        if let Some(ip) = self.client_ip {
            metadata.insert("client_ip".into(), Value::String(ip.to_string()));
        }
        if let Some(country) = &self.country {
            metadata.insert("country".into(), Value::String(country.clone()));
        }
        metadata
    }
}

/// Builds [`RequestContext`]s with the dependencies chosen at startup.
#[derive(Clone, Default)]
pub struct ContextFactory {
    geo: Option<Arc<dyn GeoResolver>>,
    trust_forwarded: bool,
}

impl ContextFactory {
    pub fn new(geo: Option<Arc<dyn GeoResolver>>, trust_forwarded: bool) -> Self {
        Self { geo, trust_forwarded }
    }

    pub fn build(&self, parts: &Parts, body: Map<String, Value>, path_params: PathParams) -> RequestContext {
        let ip = client_ip(&parts.headers, &parts.extensions, self.trust_forwarded);
        let country = match (&self.geo, ip) {
            (Some(geo), Some(ip)) => geo.country_code(ip),
            _ => None,
        };

        let mut context = RequestContext::new(parts.method.clone(), parts.uri.path())
            .with_headers(parts.headers.clone())
            .with_query(parse_query(parts.uri.query()))
            .with_body(body)
            .with_path_params(path_params)
            .with_client(ip, country);

        if let Some(session) = parts.extensions.get::<Session>() {
            context = context.with_session(session.clone());
        }
        context
    }
}

/// Decode a URL query string. Repeated keys keep the last value.
pub fn parse_query(query: Option<&str>) -> Map<String, Value> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::geo::StaticGeoResolver;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::Request;
    use serde_json::json;
    use std::net::SocketAddr;

    #[test]
    fn test_factory_builds_context() {
        let mut req = Request::builder()
            .method("POST")
            .uri("/users/5?page=2&q=a%20b")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("203.0.113.7:5000".parse::<SocketAddr>().unwrap()));
        let mut session = Session::new();
        session.insert("user_id", json!("u1"));
        req.extensions_mut().insert(session);
        let (parts, _) = req.into_parts();

        let geo = StaticGeoResolver::new().with("203.0.113.7".parse().unwrap(), "NZ");
        let factory = ContextFactory::new(Some(Arc::new(geo)), false);

        let mut params = PathParams::new();
        params.insert("id".into(), "5".into());
        let body = json!({"name": "Ada"}).as_object().cloned().unwrap();
        let ctx = factory.build(&parts, body, params);

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/users/5");
        assert_eq!(ctx.param("id"), Some(json!("5")));
        assert_eq!(ctx.param("q"), Some(json!("a b")));
        assert_eq!(ctx.param("name"), Some(json!("Ada")));
        assert_eq!(ctx.country(), Some("NZ"));
        assert!(ctx.session().is_some());

        let metadata = ctx.client_metadata();
        assert_eq!(metadata["client_ip"], "203.0.113.7");
        assert_eq!(metadata["country"], "NZ");
    }

    #[test]
    fn test_path_params_override_body_in_merge() {
        let mut params = PathParams::new();
        params.insert("id".into(), "path".into());
        let ctx = RequestContext::new(Method::PUT, "/x")
            .with_body(json!({"id": "body", "other": 1}).as_object().cloned().unwrap())
            .with_path_params(params);

        let merged = ctx.params();
        assert_eq!(merged["id"], "path");
        assert_eq!(merged["other"], 1);
    }
}
