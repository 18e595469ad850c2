//! RPC method names and the `initialize` manifest.
//!
//! ```text
//! MCP  users        Users.list                → users/list
//! MCP  users        Users.show   action=get   → users/get
//! TOOL create_user  Tools.create_user         → create_user
//! ```

use std::sync::Arc;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::McpConfig;
use crate::routing::{RouteDefinition, RouteKind, RouteTable};

pub const INITIALIZE: &str = "initialize";
const DEFAULT_RESOURCE_ACTION: &str = "list";

/// The RPC method a route exposes, `None` for web routes.
pub fn method_name(route: &RouteDefinition) -> Option<String> {
    let id = route.identifier()?;
    match route.kind() {
        RouteKind::McpTool => Some(id.to_string()),
        RouteKind::McpResource => match route.option("action") {
            Some(action) => Some(format!("{id}/{action}")),
            // Identifier already carries its action (`MCP users/get ...`).
            None if id.contains('/') => Some(id.to_string()),
            None => Some(format!("{id}/{DEFAULT_RESOURCE_ACTION}")),
        },
        RouteKind::Web => None,
    }
}

/// Arguments a tool declares as required (`required=email,name`).
pub fn required_args(route: &RouteDefinition) -> Vec<String> {
    route
        .option("required")
        .map(split_list)
        .unwrap_or_default()
}

/// JSON schema built from `params=name:type,...` and `required=...`.
pub fn input_schema(route: &RouteDefinition) -> Value {
    let mut properties = Map::new();
    for spec in route.option("params").map(split_list).unwrap_or_default() {
        let (name, ty) = match spec.split_once(':') {
            Some((name, ty)) => (name.trim().to_string(), ty.trim().to_string()),
            None => (spec, "string".to_string()),
        };
        properties.insert(name, json!({ "type": ty }));
    }
    let required = required_args(route);
    for name in &required {
        properties
            .entry(name.clone())
            .or_insert_with(|| json!({ "type": "string" }));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodTableError {
    #[error("RPC method '{method}' declared on line {first} and again on line {second}")]
    Duplicate {
        method: String,
        first: usize,
        second: usize,
    },

    #[error("route on line {line} shadows the built-in '{INITIALIZE}' method")]
    ShadowsInitialize { line: usize },
}

/// Derived method → route map, in route-file order.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: Vec<(String, Arc<RouteDefinition>)>,
}

impl MethodTable {
    pub fn build(table: &RouteTable) -> Result<Self, MethodTableError> {
        let mut methods: Vec<(String, Arc<RouteDefinition>)> = Vec::new();
        for route in table.rpc_routes() {
            let Some(name) = method_name(route) else {
                continue;
            };
            if name == INITIALIZE {
                return Err(MethodTableError::ShadowsInitialize { line: route.line });
            }
            if let Some((_, first)) = methods.iter().find(|(existing, _)| *existing == name) {
                return Err(MethodTableError::Duplicate {
                    method: name,
                    first: first.line,
                    second: route.line,
                });
            }
            methods.push((name, route.clone()));
        }
        Ok(Self { methods })
    }

    pub fn get(&self, method: &str) -> Option<&Arc<RouteDefinition>> {
        self.methods
            .iter()
            .find(|(name, _)| name == method)
            .map(|(_, route)| route)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// The `initialize` result: server info plus every resource and tool.
    pub fn manifest(&self, config: &McpConfig) -> Value {
        let mut resources = Vec::new();
        let mut tools = Vec::new();

        for (name, route) in &self.methods {
            let id = route.identifier().unwrap_or(name);
            let description = route.option("description").unwrap_or_default();
            match route.kind() {
                RouteKind::McpResource => resources.push(json!({
                    "uri": route.option("uri").unwrap_or(id),
                    "name": route.option("name").unwrap_or(id),
                    "description": description,
                    "method": name,
                })),
                RouteKind::McpTool => tools.push(json!({
                    "name": name,
                    "description": description,
                    "inputSchema": input_schema(route),
                })),
                RouteKind::Web => {}
            }
        }

        json!({
            "protocolVersion": config.protocol_version,
            "serverInfo": {
                "name": config.server_name,
                "version": config.server_version,
            },
            "capabilities": {
                "resources": {},
                "tools": {},
            },
            "resources": resources,
            "tools": tools,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(source: &str) -> RouteTable {
        RouteTable::parse(source).unwrap()
    }

    #[test]
    fn test_method_names() {
        let t = table(
            "MCP users Handler.mcp_list_users\n\
             MCP users Handler.mcp_get_user action=get\n\
             MCP /orders/get Orders.show\n\
             TOOL create_user Handler.mcp_create_user\n\
             GET /users Users#index\n",
        );
        let names: Vec<_> = t.iter().map(|r| method_name(r)).collect();
        assert_eq!(
            names,
            vec![
                Some("users/list".to_string()),
                Some("users/get".to_string()),
                Some("orders/get".to_string()),
                Some("create_user".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_duplicate_methods_rejected() {
        let t = table("MCP users A.list\nMCP users B.list\n");
        assert_eq!(
            MethodTable::build(&t).unwrap_err(),
            MethodTableError::Duplicate {
                method: "users/list".into(),
                first: 1,
                second: 2,
            }
        );
    }

    #[test]
    fn test_initialize_cannot_be_shadowed() {
        let t = table("GET /x X#y\nTOOL initialize Tools.init\n");
        assert_eq!(
            MethodTable::build(&t).unwrap_err(),
            MethodTableError::ShadowsInitialize { line: 2 }
        );
    }

    #[test]
    fn test_manifest_mirrors_table() {
        let t = table(
            "MCP users Handler.mcp_list_users description=\"All users\"\n\
             MCP users Handler.mcp_get_user action=get uri=app://users\n\
             TOOL create_user Handler.mcp_create_user params=email:string,age:integer required=email\n\
             GET /users Users#index\n",
        );
        let methods = MethodTable::build(&t).unwrap();
        let manifest = methods.manifest(&McpConfig::default());

        let resources = manifest["resources"].as_array().unwrap();
        let tools = manifest["tools"].as_array().unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(tools.len(), 1);
        assert_eq!(resources[0]["name"], "users");
        assert_eq!(resources[0]["description"], "All users");
        assert_eq!(resources[1]["uri"], "app://users");
        assert_eq!(tools[0]["name"], "create_user");
        assert_eq!(tools[0]["inputSchema"]["properties"]["age"]["type"], "integer");
        assert_eq!(tools[0]["inputSchema"]["required"][0], "email");
        assert_eq!(manifest["protocolVersion"], "2024-11-05");
    }
}
