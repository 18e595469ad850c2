//! The ordered route table loaded at startup.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::routing::definition::{RouteDefinition, RouteKind};
use crate::routing::grammar::{parse_routes, RouteSyntaxError};

#[derive(Debug, Error)]
pub enum RouteLoadError {
    #[error("failed to read route file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Syntax(#[from] RouteSyntaxError),
}

/// Routes in file order. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteDefinition>>,
}

impl RouteTable {
    pub fn parse(source: &str) -> Result<Self, RouteSyntaxError> {
        let routes = parse_routes(source)?.into_iter().map(Arc::new).collect();
        Ok(Self { routes })
    }

    pub fn from_file(path: &Path) -> Result<Self, RouteLoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| RouteLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::parse(&source)?;
        tracing::info!(
            path = %path.display(),
            routes = table.len(),
            "Route table loaded"
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.routes.iter()
    }

    pub fn web_routes(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.routes.iter().filter(|r| r.kind() == RouteKind::Web)
    }

    /// MCP resources and tools, in file order.
    pub fn rpc_routes(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.routes.iter().filter(|r| r.kind().is_rpc())
    }
}

impl FromIterator<RouteDefinition> for RouteTable {
    fn from_iter<I: IntoIterator<Item = RouteDefinition>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partition_by_kind() {
        let table = RouteTable::parse(
            "GET / Home#index\nMCP users Users.list\nTOOL create_user Users.create\nGET 404 Errors#missing",
        )
        .unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.web_routes().count(), 2);
        assert_eq!(table.rpc_routes().count(), 2);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# app routes").unwrap();
        writeln!(file, "GET /health System#health").unwrap();
        let table = RouteTable::from_file(file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_from_file_reports_syntax_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GET /health").unwrap();
        let err = RouteTable::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RouteLoadError::Syntax(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RouteTable::from_file(Path::new("/nonexistent/routes.txt")).unwrap_err();
        assert!(matches!(err, RouteLoadError::Io { .. }));
    }
}
