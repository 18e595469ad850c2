//! Ordered middleware stack.
//!
//! Entries are keyed by a stable [`Middleware::id`], so adding the same
//! middleware twice keeps the first registration (and its args).
//!
//! `build_app` folds right-to-left: the last-added entry wraps the base
//! application first, the first-added entry wraps everything else. At
//! runtime that means left-to-right execution on the way in and the
//! reverse on the way out.
//!
//! ```text
//! stack: [A, B, C]
//! build: A(B(C(base)))
//! run:   A → B → C → base → C → B → A
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::SecurityConfig;
use crate::http::endpoint::Endpoint;

/// Construction arguments handed to a middleware when the stack is built.
pub struct MiddlewareArgs<'a> {
    pub positional: &'a [Value],
    pub options: &'a Map<String, Value>,
    /// Present only for security-aware middleware.
    pub security: Option<Arc<SecurityConfig>>,
}

impl MiddlewareArgs<'_> {
    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options.get(key).and_then(Value::as_u64)
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }
}

/// A request-pipeline wrapper.
pub trait Middleware: Send + Sync {
    /// Stable identifier used for deduplication.
    fn id(&self) -> &str;

    /// Security-aware middleware receive the shared [`SecurityConfig`].
    fn security_aware(&self) -> bool {
        false
    }

    fn wrap(&self, next: Endpoint, args: MiddlewareArgs<'_>) -> Endpoint;
}

#[derive(Clone)]
pub struct MiddlewareEntry {
    pub middleware: Arc<dyn Middleware>,
    pub args: Vec<Value>,
    pub options: Map<String, Value>,
}

#[derive(Clone, Default)]
pub struct MiddlewareStack {
    entries: Vec<MiddlewareEntry>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware unless one with the same id is already present.
    /// Returns `true` when the entry was added.
    pub fn add(
        &mut self,
        middleware: Arc<dyn Middleware>,
        args: Vec<Value>,
        options: Map<String, Value>,
    ) -> bool {
        if self.contains(middleware.id()) {
            tracing::debug!(middleware = middleware.id(), "Middleware already registered, keeping first entry");
            return false;
        }
        self.entries.push(MiddlewareEntry {
            middleware,
            args,
            options,
        });
        true
    }

    /// Shorthand for `add` without args or options.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) -> bool {
        self.add(middleware, Vec::new(), Map::new())
    }

    /// Remove the middleware with `id`. Returns `true` if it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.middleware.id() != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.middleware.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&MiddlewareEntry> {
        self.entries.iter().find(|entry| entry.middleware.id() == id)
    }

    pub fn entries(&self) -> &[MiddlewareEntry] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.middleware.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wrap `base` so the first-added middleware ends up outermost.
    pub fn build_app(&self, base: Endpoint, security: Arc<SecurityConfig>) -> Endpoint {
        self.entries.iter().rev().fold(base, |next, entry| {
            let security = entry.middleware.security_aware().then(|| security.clone());
            entry.middleware.wrap(
                next,
                MiddlewareArgs {
                    positional: &entry.args,
                    options: &entry.options,
                    security,
                },
            )
        })
    }
}
