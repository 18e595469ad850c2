//! Authentication strategies.
//!
//! A route's `auth` option is parsed into an [`AuthRequirement`]: a
//! [`StrategyKind`] picked from a prefix table plus an optional argument
//! (`role:admin` → Role with `admin`). Exactly one strategy runs per route;
//! routes without a requirement run [`StrategyKind::None`] so downstream
//! code always receives a [`StrategyResult`].

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::context::RequestContext;
use crate::auth::result::{AuthFailure, StrategyResult, User, UserRecord};
use crate::config::AuthConfig;
use crate::session::{value_as_string, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    None,
    Session,
    Role,
    Permission,
    ApiKey,
}

/// Requirement prefix → strategy. New kinds register here.
const STRATEGY_TABLE: &[(&str, StrategyKind)] = &[
    ("none", StrategyKind::None),
    ("anonymous", StrategyKind::None),
    ("session", StrategyKind::Session),
    ("role", StrategyKind::Role),
    ("permission", StrategyKind::Permission),
    ("api_key", StrategyKind::ApiKey),
    ("apikey", StrategyKind::ApiKey),
];

impl StrategyKind {
    pub fn lookup(name: &str) -> Option<Self> {
        STRATEGY_TABLE
            .iter()
            .find(|(prefix, _)| *prefix == name)
            .map(|(_, kind)| *kind)
    }

    /// The `strategy_name` / `auth_method` tag this strategy reports.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::None => "none",
            StrategyKind::Session => "session",
            StrategyKind::Role => "role",
            StrategyKind::Permission => "permission",
            StrategyKind::ApiKey => "api_key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementError {
    #[error("unknown authentication strategy '{0}'")]
    UnknownStrategy(String),

    #[error("strategy '{0}' requires an argument (e.g. {0}:name)")]
    MissingArgument(String),

    #[error("strategy '{0}' does not take an argument")]
    UnexpectedArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequirement {
    pub kind: StrategyKind,
    pub argument: Option<String>,
}

impl AuthRequirement {
    pub fn none() -> Self {
        Self {
            kind: StrategyKind::None,
            argument: None,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, RequirementError> {
        let (name, argument) = match raw.split_once(':') {
            Some((name, arg)) => (name, Some(arg.to_string()).filter(|a| !a.is_empty())),
            None => (raw, None),
        };

        let kind =
            StrategyKind::lookup(name).ok_or_else(|| RequirementError::UnknownStrategy(name.to_string()))?;

        match (kind, &argument) {
            (StrategyKind::Permission, None) => Err(RequirementError::MissingArgument(name.to_string())),
            (StrategyKind::None | StrategyKind::Session | StrategyKind::ApiKey, Some(_)) => {
                Err(RequirementError::UnexpectedArgument(name.to_string()))
            }
            _ => Ok(Self { kind, argument }),
        }
    }
}

impl fmt::Display for AuthRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(arg) => write!(f, "{}:{}", self.kind.name(), arg),
            None => f.write_str(self.kind.name()),
        }
    }
}

/// Runs the strategy a requirement selects.
#[derive(Debug, Clone, Default)]
pub struct StrategyResolver {
    config: AuthConfig,
}

impl StrategyResolver {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate against a raw requirement string (`None` ⇒ no auth).
    pub fn resolve(&self, ctx: &RequestContext, requirement: Option<&str>) -> Result<StrategyResult, AuthFailure> {
        let requirement = match requirement {
            Some(raw) => match AuthRequirement::parse(raw) {
                Ok(req) => req,
                // Requirements are validated at startup; a bad one here fails closed.
                Err(e) => return Err(AuthFailure::forbidden(raw, e.to_string())),
            },
            None => AuthRequirement::none(),
        };
        self.authenticate(ctx, &requirement)
    }

    pub fn authenticate(
        &self,
        ctx: &RequestContext,
        requirement: &AuthRequirement,
    ) -> Result<StrategyResult, AuthFailure> {
        let outcome = match requirement.kind {
            StrategyKind::None => Ok(self.no_auth(ctx)),
            StrategyKind::Session => self.session_auth(ctx),
            StrategyKind::Role => self.role_auth(ctx, requirement.argument.as_deref()),
            StrategyKind::Permission => {
                self.permission_auth(ctx, requirement.argument.as_deref().unwrap_or_default())
            }
            StrategyKind::ApiKey => self.api_key_auth(ctx),
        };

        match &outcome {
            Ok(result) => tracing::debug!(
                strategy = result.strategy_name(),
                authenticated = result.is_authenticated(),
                "Authentication resolved"
            ),
            Err(failure) => tracing::info!(
                strategy = failure.auth_method(),
                reason = failure.failure_reason(),
                "Authentication failed"
            ),
        }
        outcome
    }

    fn no_auth(&self, ctx: &RequestContext) -> StrategyResult {
        StrategyResult::anonymous(ctx.client_metadata())
    }

    fn session_auth(&self, ctx: &RequestContext) -> Result<StrategyResult, AuthFailure> {
        let kind = StrategyKind::Session;
        let session = ctx
            .session()
            .ok_or_else(|| AuthFailure::unauthenticated(kind.name(), "No session available"))?;
        let user = self
            .session_user(session)
            .ok_or_else(|| AuthFailure::unauthenticated(kind.name(), "Not authenticated"))?;

        Ok(self.success(ctx, session, Some(User::Record(user)), kind))
    }

    fn role_auth(&self, ctx: &RequestContext, required: Option<&str>) -> Result<StrategyResult, AuthFailure> {
        let kind = StrategyKind::Role;
        let session = ctx
            .session()
            .ok_or_else(|| AuthFailure::unauthenticated(kind.name(), "No session available"))?;
        let roles = session.string_list(&self.config.session_roles_key);

        match required {
            Some(role) => {
                if !roles.iter().any(|r| r == role) {
                    return Err(AuthFailure::forbidden(
                        kind.name(),
                        format!("Missing required role: {role}"),
                    ));
                }
            }
            None => {
                let allowed = &self.config.allowed_roles;
                if !roles.iter().any(|r| allowed.contains(r)) {
                    return Err(AuthFailure::forbidden(
                        kind.name(),
                        format!("Missing required role (one of: {})", allowed.join(", ")),
                    ));
                }
            }
        }

        let user = match self.session_user(session) {
            Some(record) => User::Record(record),
            None => User::Map(role_map(&self.config.session_roles_key, roles)),
        };
        Ok(self.success(ctx, session, Some(user), kind))
    }

    fn permission_auth(&self, ctx: &RequestContext, required: &str) -> Result<StrategyResult, AuthFailure> {
        let kind = StrategyKind::Permission;
        let session = ctx
            .session()
            .ok_or_else(|| AuthFailure::unauthenticated(kind.name(), "No session available"))?;
        let permissions = session.string_list(&self.config.session_permissions_key);

        if !permissions.iter().any(|p| p == required) {
            return Err(AuthFailure::forbidden(
                kind.name(),
                format!("Missing required permission: {required}"),
            ));
        }

        let user = match self.session_user(session) {
            Some(record) => User::Record(record),
            None => User::Map(role_map(&self.config.session_permissions_key, permissions)),
        };
        Ok(self.success(ctx, session, Some(user), kind))
    }

    fn api_key_auth(&self, ctx: &RequestContext) -> Result<StrategyResult, AuthFailure> {
        let kind = StrategyKind::ApiKey;
        let key = self
            .header_key(ctx)
            .map(str::to_string)
            .or_else(|| {
                ctx.param(&self.config.api_key_param)
                    .as_ref()
                    .and_then(value_as_string)
                    .filter(|k| !k.is_empty())
            })
            .ok_or_else(|| AuthFailure::unauthenticated(kind.name(), "No API key provided"))?;

        if !self.config.api_keys.is_empty() && !self.config.api_keys.contains(&key) {
            return Err(AuthFailure::unauthenticated(kind.name(), "Invalid API key"));
        }

        let mut user = Map::new();
        user.insert("id".into(), Value::String(format!("api_key:{}", key_fingerprint(&key))));
        let mut metadata = ctx.client_metadata();
        metadata.insert("api_key_source".into(), Value::String(self.key_source(ctx)));

        let session = ctx.session().map(|s| s.as_map().clone()).unwrap_or_default();
        Ok(StrategyResult::new(
            session,
            Some(User::Map(user)),
            kind.name(),
            metadata,
            kind.name(),
        ))
    }

    /// A blank header counts as absent so the param fallback still applies.
    fn header_key<'a>(&self, ctx: &'a RequestContext) -> Option<&'a str> {
        ctx.header(&self.config.api_key_header)
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    fn key_source(&self, ctx: &RequestContext) -> String {
        if self.header_key(ctx).is_some() {
            "header".to_string()
        } else {
            "param".to_string()
        }
    }

    /// A minimal user record from the configured session keys.
    fn session_user(&self, session: &Session) -> Option<UserRecord> {
        let id = session.get(&self.config.session_user_key).and_then(value_as_string)?;
        let name = session
            .get(&self.config.session_user_name_key)
            .and_then(value_as_string);
        let roles = session
            .contains(&self.config.session_roles_key)
            .then(|| session.string_list(&self.config.session_roles_key));
        let permissions = session
            .contains(&self.config.session_permissions_key)
            .then(|| session.string_list(&self.config.session_permissions_key));

        Some(UserRecord {
            id,
            name,
            roles,
            permissions,
        })
    }

    fn success(&self, ctx: &RequestContext, session: &Session, user: Option<User>, kind: StrategyKind) -> StrategyResult {
        StrategyResult::new(
            session.as_map().clone(),
            user,
            kind.name(),
            ctx.client_metadata(),
            kind.name(),
        )
    }
}

fn role_map(key: &str, values: Vec<String>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(
        key.to_string(),
        Value::Array(values.into_iter().map(Value::String).collect()),
    );
    map
}

/// First eight characters, enough to tell keys apart in logs.
fn key_fingerprint(key: &str) -> String {
    key.chars().take(8).collect()
}
