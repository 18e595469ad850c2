//! Session collaborator.
//!
//! # Data Flow
//! ```text
//! Request (Cookie: <cookie_name>=<id>)
//!     → SessionLoader middleware
//!     → SessionStore::load(id)
//!     → Session inserted into request extensions
//!     → read by RequestContext / auth strategies
//! ```
//!
//! # Design Decisions
//! - The store is an external collaborator behind a trait; only the
//!   in-memory store ships here
//! - Store failures degrade to "no session" and are logged, never surfaced

pub mod loader;
pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use loader::SessionLoader;
pub use store::{InMemorySessionStore, SessionError, SessionStore};

/// A per-request snapshot of session data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(Map<String, Value>);

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// A string list stored under `key`; a single string counts as a
    /// one-element list.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        value_as_string_list(self.get(key))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Session {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Scalar values as strings: strings unquoted, numbers and bools printed.
pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn value_as_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_as_string).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}
