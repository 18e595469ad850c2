//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.mcp.endpoint, "/_mcp");
        assert_eq!(config.auth.api_key_header, "X-API-Key");
        assert!(!config.rate_limit.fail_open);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
            [mcp]
            endpoint = "/rpc"
            auth_token = "secret"

            [auth]
            allowed_roles = ["admin", "editor"]
            api_keys = ["k1"]

            [rate_limit]
            enabled = true
            max_requests = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.mcp.endpoint, "/rpc");
        assert_eq!(config.mcp.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.auth.allowed_roles, vec!["admin", "editor"]);
        assert_eq!(config.auth.login_path, "/login");
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[mcp\nendpoint = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error() {
        let err = parse_config("[security]\nmax_body_size = 0").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "security.max_body_size"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/waypoint.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
