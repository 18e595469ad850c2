//! Shared-token guard in front of the RPC endpoint.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::config::McpConfig;
use crate::rpc::error::RpcError;
use crate::rpc::method::INITIALIZE;

pub const MCP_TOKEN_HEADER: &str = "x-mcp-token";

#[derive(Debug, Clone, Default)]
pub struct TokenGuard {
    token: Option<String>,
    allow_unauthenticated_initialize: bool,
}

impl TokenGuard {
    pub fn new(token: Option<String>, allow_unauthenticated_initialize: bool) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
            allow_unauthenticated_initialize,
        }
    }

    pub fn from_config(config: &McpConfig) -> Self {
        Self::new(config.auth_token.clone(), config.allow_unauthenticated_initialize)
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// `Err` carries -32000 for a missing token and -32003 for a wrong one.
    pub fn check(&self, headers: &HeaderMap, method: &str) -> Result<(), RpcError> {
        let Some(expected) = &self.token else {
            return Ok(());
        };
        if method == INITIALIZE && self.allow_unauthenticated_initialize {
            return Ok(());
        }

        match presented_token(headers) {
            None => Err(RpcError::unauthorized("Authentication required")),
            Some(token) if token_matches(token, expected) => Ok(()),
            Some(_) => Err(RpcError::forbidden("Invalid token")),
        }
    }
}

/// `Authorization: Bearer <t>` first, then `X-MCP-Token: <t>`.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    bearer
        .or_else(|| {
            headers
                .get(MCP_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        })
        .filter(|t| !t.is_empty())
}

fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
