//! Middleware that loads the current session into request extensions.

use std::sync::Arc;

use crate::http::endpoint::Endpoint;
use crate::http::middleware::{Middleware, MiddlewareArgs};
use crate::http::request::cookie_value;
use crate::session::store::SessionStore;

pub struct SessionLoader {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
}

impl SessionLoader {
    pub const ID: &'static str = "session";

    pub fn new(store: Arc<dyn SessionStore>, cookie_name: impl Into<String>) -> Self {
        Self {
            store,
            cookie_name: cookie_name.into(),
        }
    }
}

impl Middleware for SessionLoader {
    fn id(&self) -> &str {
        Self::ID
    }

    fn wrap(&self, next: Endpoint, args: MiddlewareArgs<'_>) -> Endpoint {
        let store = self.store.clone();
        let cookie_name = args
            .option_str("cookie_name")
            .unwrap_or(&self.cookie_name)
            .to_string();

        Endpoint::new(move |mut req| {
            let next = next.clone();
            let store = store.clone();
            let session_id = cookie_value(req.headers(), &cookie_name);
            async move {
                if let Some(id) = session_id {
                    match store.load(&id).await {
                        Ok(Some(session)) => {
                            req.extensions_mut().insert(session);
                        }
                        Ok(None) => {
                            tracing::debug!("Session cookie did not match a stored session");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Session lookup failed, continuing without session");
                        }
                    }
                }
                next.call(req).await
            }
        })
    }
}
