//! Session storage backends.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::session::Session;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend unavailable: {0}")]
    Unavailable(String),
}

/// Loads sessions by id. Implementations must be safe to call from many
/// request tasks at once.
pub trait SessionStore: Send + Sync {
    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Session>, SessionError>>;
}

/// A thread-safe in-memory session store.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, session: Session) {
        self.inner.insert(id.into(), session);
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.inner.remove(id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Session>, SessionError>> {
        let session = self.inner.get(id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(session) })
    }
}
