//! Authentication outcomes.
//!
//! Both [`StrategyResult`] and [`AuthFailure`] are immutable values created
//! fresh per request.

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::session::{value_as_string, value_as_string_list};

pub const ANONYMOUS: &str = "anonymous";

/// A typed user record built by a strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub roles: Option<Vec<String>>,
    pub permissions: Option<Vec<String>>,
}

/// The authenticated identity: a typed record or a loose mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum User {
    Record(UserRecord),
    Map(Map<String, Value>),
}

impl User {
    fn record(&self) -> Option<&UserRecord> {
        match self {
            User::Record(record) => Some(record),
            User::Map(_) => None,
        }
    }

    fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        match self {
            User::Map(map) => keys.iter().find_map(|k| map.get(*k).filter(|v| !v.is_null())),
            User::Record(_) => None,
        }
    }
}

/// A successful (possibly anonymous) authentication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    session: Map<String, Value>,
    user: Option<User>,
    auth_method: String,
    metadata: Map<String, Value>,
    strategy_name: String,
}

impl StrategyResult {
    pub fn new(
        session: Map<String, Value>,
        user: Option<User>,
        auth_method: impl Into<String>,
        metadata: Map<String, Value>,
        strategy_name: impl Into<String>,
    ) -> Self {
        Self {
            session,
            user,
            auth_method: auth_method.into(),
            metadata,
            strategy_name: strategy_name.into(),
        }
    }

    /// No identity, `auth_method = "anonymous"`.
    pub fn anonymous(metadata: Map<String, Value>) -> Self {
        Self::new(Map::new(), None, ANONYMOUS, metadata, "none")
    }

    pub fn session(&self) -> &Map<String, Value> {
        &self.session
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn auth_method(&self) -> &str {
        &self.auth_method
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_anonymous(&self) -> bool {
        !self.is_authenticated()
    }

    /// True only when a real strategy ran and produced a user.
    pub fn auth_attempt_succeeded(&self) -> bool {
        self.is_authenticated() && self.auth_method != ANONYMOUS
    }

    pub fn user_id(&self) -> Option<String> {
        self.resolve(
            |r| Some(r.id.clone()),
            value_as_string,
            &["id", "user_id"],
            "user_id",
        )
    }

    pub fn user_name(&self) -> Option<String> {
        self.resolve(
            |r| r.name.clone(),
            value_as_string,
            &["name", "user_name"],
            "user_name",
        )
    }

    pub fn roles(&self) -> Option<Vec<String>> {
        self.resolve(
            |r| r.roles.clone(),
            |v| Some(value_as_string_list(Some(v))),
            &["roles"],
            "roles",
        )
    }

    pub fn permissions(&self) -> Option<Vec<String>> {
        self.resolve(
            |r| r.permissions.clone(),
            |v| Some(value_as_string_list(Some(v))),
            &["permissions"],
            "permissions",
        )
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().is_some_and(|roles| roles.iter().any(|r| r == role))
    }

    /// Typed accessor on the user, then user mapping keys, then the session.
    fn resolve<T>(
        &self,
        typed: impl Fn(&UserRecord) -> Option<T>,
        convert: impl Fn(&Value) -> Option<T>,
        user_keys: &[&str],
        session_key: &str,
    ) -> Option<T> {
        if let Some(user) = &self.user {
            if let Some(value) = user.record().and_then(&typed) {
                return Some(value);
            }
            if let Some(value) = user.lookup(user_keys).and_then(&convert) {
                return Some(value);
            }
        }
        self.session
            .get(session_key)
            .filter(|v| !v.is_null())
            .and_then(&convert)
    }
}

/// Why a failure happened; decides between 401 and 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No usable identity (no session, no key).
    MissingIdentity,
    /// Identity present but lacking a role or permission.
    InsufficientPrivilege,
}

/// A failed authentication. Never carries a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthFailure {
    failure_reason: String,
    auth_method: String,
    kind: FailureKind,
}

impl AuthFailure {
    pub fn new(kind: FailureKind, auth_method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            failure_reason: reason.into(),
            auth_method: auth_method.into(),
            kind,
        }
    }

    pub fn unauthenticated(auth_method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(FailureKind::MissingIdentity, auth_method, reason)
    }

    pub fn forbidden(auth_method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(FailureKind::InsufficientPrivilege, auth_method, reason)
    }

    pub fn failure_reason(&self) -> &str {
        &self.failure_reason
    }

    pub fn auth_method(&self) -> &str {
        &self.auth_method
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn is_authenticated(&self) -> bool {
        false
    }

    pub fn is_anonymous(&self) -> bool {
        true
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            FailureKind::MissingIdentity => StatusCode::UNAUTHORIZED,
            FailureKind::InsufficientPrivilege => StatusCode::FORBIDDEN,
        }
    }
}
