//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Where the route table lives.
    pub routes: RoutesConfig,

    /// JSON-RPC (MCP) endpoint settings.
    pub mcp: McpConfig,

    /// Authentication strategy settings.
    pub auth: AuthConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Security hardening, shared with security-aware middleware.
    pub security: SecurityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent in-flight requests.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Path to the route grammar file.
    pub path: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            path: "config/routes.txt".to_string(),
        }
    }
}

/// JSON-RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct McpConfig {
    pub enabled: bool,

    /// Path of the single multiplexed endpoint.
    pub endpoint: String,

    /// Token required as `Authorization: Bearer` or `X-MCP-Token`.
    /// `None` leaves the endpoint open.
    pub auth_token: Option<String>,

    /// Let `initialize` through without a token.
    pub allow_unauthenticated_initialize: bool,

    pub server_name: String,
    pub server_version: String,
    pub protocol_version: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "/_mcp".to_string(),
            auth_token: None,
            allow_unauthenticated_initialize: false,
            server_name: "waypoint".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: "2024-11-05".to_string(),
        }
    }
}

/// Settings consumed by the authentication strategies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session key holding the authenticated user's id.
    pub session_user_key: String,
    pub session_user_name_key: String,
    pub session_roles_key: String,
    pub session_permissions_key: String,

    /// Roles accepted by a bare `auth=role` requirement (any overlap passes).
    pub allowed_roles: Vec<String>,

    /// Header checked first for an API key.
    pub api_key_header: String,
    /// Query or body parameter checked when the header is absent.
    pub api_key_param: String,
    /// Accepted keys. Empty accepts any non-empty key.
    pub api_keys: Vec<String>,

    /// Where non-JSON routes redirect on 401.
    pub login_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_user_key: "user_id".to_string(),
            session_user_name_key: "user_name".to_string(),
            session_roles_key: "roles".to_string(),
            session_permissions_key: "permissions".to_string(),
            allowed_roles: Vec::new(),
            api_key_header: "X-API-Key".to_string(),
            api_key_param: "api_key".to_string(),
            api_keys: Vec::new(),
            login_path: "/login".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the session id.
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "waypoint_session".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client per window.
    pub max_requests: u64,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Allow traffic when the counting backend fails. Off by default.
    pub fail_open: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: 100,
            window_secs: 60,
            fail_open: false,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,

    /// Enable double-submit CSRF checks on unsafe methods.
    pub csrf_enabled: bool,
    pub csrf_header: String,
    pub csrf_cookie: String,
    /// Path patterns (`/hooks/:id`) exempt from CSRF checks.
    pub csrf_exempt_paths: Vec<String>,

    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    pub trust_forwarded_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            csrf_enabled: false,
            csrf_header: "X-CSRF-Token".to_string(),
            csrf_cookie: "csrf_token".to_string(),
            csrf_exempt_paths: Vec::new(),
            max_body_size: 2 * 1024 * 1024, // 2MB
            trust_forwarded_headers: false,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// `pretty` for development, `json` for production.
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
