//! Line-oriented route grammar.
//!
//! ```text
//! # comment
//! GET    /users/:id   Users#show          response_type=json auth=session
//! POST   /users       Users#create        csrf=false
//! GET    404          Errors#not_found
//! MCP    users        Handler.mcp_list_users description="List all users"
//! TOOL   create_user  Handler.mcp_create_user params=name:string,email:string required=name
//! ```
//!
//! Tokens are separated by whitespace; option values may be double-quoted
//! to carry spaces. Option tokens without `=` are skipped so that newer
//! route files still load on older builds.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::routing::definition::{HandlerReference, RouteDefinition, RouteTarget, Verb};
use crate::routing::matcher::PathPattern;

/// Why a route line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("unknown route keyword '{0}'")]
    UnknownKeyword(String),

    #[error("missing path or identifier")]
    MissingTarget,

    #[error("missing handler reference")]
    MissingHandler,

    #[error("invalid handler reference '{0}' (expected Namespace#method or Namespace.method)")]
    InvalidHandler(String),

    #[error("malformed option '{0}' (expected key=value)")]
    MalformedOption(String),

    #[error("duplicate option '{0}'")]
    DuplicateOption(String),

    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// A route line that could not be parsed. Fatal at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("route syntax error on line {line}: {kind} (in `{content}`)")]
pub struct RouteSyntaxError {
    pub line: usize,
    pub content: String,
    pub kind: SyntaxErrorKind,
}

/// Parse a whole route file. Blank lines and `#` comments are skipped.
pub fn parse_routes(source: &str) -> Result<Vec<RouteDefinition>, RouteSyntaxError> {
    let mut routes = Vec::new();
    for (index, line) in source.lines().enumerate() {
        if let Some(route) = parse_line(line, index + 1)? {
            routes.push(route);
        }
    }
    Ok(routes)
}

/// Parse one line. Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<RouteDefinition>, RouteSyntaxError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let error = |kind| RouteSyntaxError {
        line: line_no,
        content: trimmed.to_string(),
        kind,
    };

    let tokens = tokenize(trimmed).map_err(error)?;
    let mut tokens = tokens.into_iter();

    let keyword = tokens.next().unwrap_or_default();
    let verb = Verb::from_keyword(&keyword)
        .ok_or_else(|| error(SyntaxErrorKind::UnknownKeyword(keyword.clone())))?;

    let target_token = tokens
        .next()
        .ok_or_else(|| error(SyntaxErrorKind::MissingTarget))?;
    let target = parse_target(verb, &target_token).ok_or_else(|| error(SyntaxErrorKind::MissingTarget))?;

    let handler_token = tokens
        .next()
        .ok_or_else(|| error(SyntaxErrorKind::MissingHandler))?;
    let handler = HandlerReference::parse(&handler_token)
        .ok_or_else(|| error(SyntaxErrorKind::InvalidHandler(handler_token.clone())))?;

    let mut options = BTreeMap::new();
    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            tracing::warn!(line = line_no, token = %token, "Ignoring route option without '='");
            continue;
        };
        if key.is_empty() || value.is_empty() {
            return Err(error(SyntaxErrorKind::MalformedOption(token.clone())));
        }
        if options.insert(key.to_string(), value.to_string()).is_some() {
            return Err(error(SyntaxErrorKind::DuplicateOption(key.to_string())));
        }
    }

    Ok(Some(RouteDefinition {
        verb,
        target,
        handler,
        options,
        line: line_no,
    }))
}

fn parse_target(verb: Verb, token: &str) -> Option<RouteTarget> {
    if verb.kind().is_rpc() {
        let identifier = token.trim_start_matches('/');
        if identifier.is_empty() {
            return None;
        }
        return Some(RouteTarget::Identifier(identifier.to_string()));
    }

    if token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(status) = token.parse::<u16>() {
            return Some(RouteTarget::Status(status));
        }
    }

    Some(RouteTarget::Path(PathPattern::parse(token)))
}

/// Split on whitespace, honouring double quotes. Quotes are removed.
fn tokenize(line: &str) -> Result<Vec<String>, SyntaxErrorKind> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(SyntaxErrorKind::UnterminatedQuote);
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Serializes back to the grammar; `parse_line(route.to_string())` yields
/// the same verb, target, handler and options.
impl fmt::Display for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.verb)?;
        match &self.target {
            RouteTarget::Path(pattern) => write_token(f, &pattern.to_string())?,
            RouteTarget::Status(status) => write!(f, "{}", status)?,
            RouteTarget::Identifier(id) => write_token(f, id)?,
        }
        f.write_str(" ")?;
        write_token(f, &self.handler.to_string())?;
        for (key, value) in &self.options {
            f.write_str(" ")?;
            write_token(f, &format!("{key}={value}"))?;
        }
        Ok(())
    }
}

/// Quotes are stripped wherever they appear in a token, so wrapping the
/// whole token keeps embedded whitespace together.
fn write_token(f: &mut fmt::Formatter<'_>, token: &str) -> fmt::Result {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        write!(f, "\"{token}\"")
    } else {
        f.write_str(token)
    }
}
