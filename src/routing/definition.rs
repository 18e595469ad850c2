//! Parsed route entries.
//!
//! A [`RouteDefinition`] is built once by the grammar parser and never
//! mutated afterwards, so it can be shared across request tasks behind an
//! `Arc` without locking.

use std::collections::BTreeMap;
use std::fmt;

use axum::http::Method;

use crate::routing::matcher::PathPattern;

/// The keyword a route line starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Head,
    /// Read-only RPC resource.
    Mcp,
    /// RPC tool with side effects.
    Tool,
}

impl Verb {
    /// Parse a keyword token. Keywords are case-sensitive.
    pub fn from_keyword(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "DELETE" => Some(Verb::Delete),
            "HEAD" => Some(Verb::Head),
            "MCP" => Some(Verb::Mcp),
            "TOOL" => Some(Verb::Tool),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Head => "HEAD",
            Verb::Mcp => "MCP",
            Verb::Tool => "TOOL",
        }
    }

    /// The HTTP method this verb answers, `None` for the RPC kinds.
    pub fn http_method(&self) -> Option<Method> {
        match self {
            Verb::Get => Some(Method::GET),
            Verb::Post => Some(Method::POST),
            Verb::Put => Some(Method::PUT),
            Verb::Delete => Some(Method::DELETE),
            Verb::Head => Some(Method::HEAD),
            Verb::Mcp | Verb::Tool => None,
        }
    }

    pub fn kind(&self) -> RouteKind {
        match self {
            Verb::Mcp => RouteKind::McpResource,
            Verb::Tool => RouteKind::McpTool,
            _ => RouteKind::Web,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Web,
    McpResource,
    McpTool,
}

impl RouteKind {
    pub fn is_rpc(&self) -> bool {
        matches!(self, RouteKind::McpResource | RouteKind::McpTool)
    }
}

/// How the handler is reached: `Namespace#method` binds to an instance,
/// `Namespace.method` is a namespace-level function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Bound,
    Unbound,
}

impl Binding {
    fn separator(&self) -> char {
        match self {
            Binding::Bound => '#',
            Binding::Unbound => '.',
        }
    }
}

/// A `(namespace, method)` pair naming the handler to invoke.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerReference {
    pub namespace: String,
    pub method: String,
    pub binding: Binding,
}

impl HandlerReference {
    /// Parse `Namespace#method` or `Namespace.method`.
    ///
    /// The first `#` wins over `.` so that dotted namespaces such as
    /// `admin.Users#show` keep their dots.
    pub fn parse(token: &str) -> Option<Self> {
        let (namespace, method, binding) = if let Some((ns, m)) = token.split_once('#') {
            (ns, m, Binding::Bound)
        } else if let Some((ns, m)) = token.rsplit_once('.') {
            (ns, m, Binding::Unbound)
        } else {
            return None;
        };

        if namespace.is_empty() || method.is_empty() {
            return None;
        }

        Some(Self {
            namespace: namespace.to_string(),
            method: method.to_string(),
            binding,
        })
    }

    /// Canonical registry key, identical to the grammar token.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HandlerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, self.binding.separator(), self.method)
    }
}

/// Route targets: either an HTTP path pattern or an RPC identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    Path(PathPattern),
    /// Fallback route for a status (`GET 404 Errors#not_found`).
    Status(u16),
    /// MCP resource or tool identifier, leading `/` already stripped.
    Identifier(String),
}

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub verb: Verb,
    pub target: RouteTarget,
    pub handler: HandlerReference,
    pub options: BTreeMap<String, String>,
    /// 1-based line number in the source file, for diagnostics.
    pub line: usize,
}

impl RouteDefinition {
    pub fn kind(&self) -> RouteKind {
        self.verb.kind()
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// The declared `auth` requirement, if any.
    pub fn auth_requirement(&self) -> Option<&str> {
        self.option("auth")
    }

    pub fn response_type(&self) -> Option<&str> {
        self.option("response_type")
    }

    /// `csrf=false` (or `csrf=exempt`) opts the route out of CSRF checks.
    pub fn csrf_exempt(&self) -> bool {
        matches!(self.option("csrf"), Some("false") | Some("exempt") | Some("off"))
    }

    /// RPC identifier for MCP and TOOL routes.
    pub fn identifier(&self) -> Option<&str> {
        match &self.target {
            RouteTarget::Identifier(id) => Some(id),
            _ => None,
        }
    }

    pub fn path_pattern(&self) -> Option<&PathPattern> {
        match &self.target {
            RouteTarget::Path(pattern) => Some(pattern),
            _ => None,
        }
    }

    pub fn fallback_status(&self) -> Option<u16> {
        match self.target {
            RouteTarget::Status(status) => Some(status),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> String {
        match &self.target {
            RouteTarget::Path(pattern) => format!("{} {}", self.verb, pattern),
            RouteTarget::Status(status) => format!("{} {}", self.verb, status),
            RouteTarget::Identifier(id) => format!("{} {}", self.verb, id),
        }
    }
}
