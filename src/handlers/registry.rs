//! Handler lookup by reference.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::handlers::handler::Handler;
use crate::routing::{HandlerReference, RouteTable};

/// Maps handler references (`Users#show`, `Tools.create_user`) to
/// implementations. Built at startup, read-only afterwards.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `reference`. A later registration for the
    /// same reference replaces the earlier one.
    pub fn register<H>(&mut self, reference: &str, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        let key = canonical(reference);
        if self.handlers.insert(key.clone(), Arc::new(handler)).is_some() {
            tracing::warn!(handler = %key, "Handler re-registered, replacing previous");
        }
        self
    }

    pub fn get(&self, reference: &HandlerReference) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&reference.key()).cloned()
    }

    pub fn contains(&self, reference: &HandlerReference) -> bool {
        self.handlers.contains_key(&reference.key())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// References used by `table` with no registered implementation.
    pub fn missing_for(&self, table: &RouteTable) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for route in table.iter().filter(|route| !self.contains(&route.handler)) {
            let key = route.handler.key();
            if !missing.contains(&key) {
                missing.push(key);
            }
        }
        missing
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("HandlerRegistry").field("handlers", &keys).finish()
    }
}

fn canonical(reference: &str) -> String {
    HandlerReference::parse(reference)
        .map(|r| r.key())
        .unwrap_or_else(|| reference.to_string())
}
