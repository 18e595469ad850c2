//! JSON-RPC 2.0 envelopes.
//!
//! Parsing is deliberately strict: anything other than a single object with
//! `jsonrpc: "2.0"`, a non-empty string `method`, a scalar-or-null `id` and
//! an object `params` is rejected as `-32600`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::rpc::error::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// A validated request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// `None` for notifications. `Some(Value::Null)` is an explicit null id.
    pub id: Option<Value>,
    pub method: String,
    pub params: Map<String, Value>,
}

impl RpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id to echo back; notifications and null ids answer `null`.
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// A rejected envelope with the id to answer under.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub id: Value,
    pub error: RpcError,
}

impl Rejection {
    fn new(id: Value, message: &str) -> Self {
        Self {
            id,
            error: RpcError::invalid_request(message),
        }
    }

    pub fn into_response(self) -> RpcResponse {
        RpcResponse::error(self.id, self.error)
    }
}

/// Parse and validate a request body.
pub fn parse_request(body: &[u8]) -> Result<RpcRequest, Rejection> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| Rejection::new(Value::Null, "Invalid JSON"))?;

    let mut object = match value {
        Value::Object(object) => object,
        Value::Array(_) => {
            return Err(Rejection::new(Value::Null, "Batch requests are not supported"))
        }
        _ => return Err(Rejection::new(Value::Null, "Request must be a JSON object")),
    };

    let id = match object.remove("id") {
        None => None,
        Some(id @ (Value::Null | Value::String(_) | Value::Number(_) | Value::Bool(_))) => Some(id),
        Some(_) => return Err(Rejection::new(Value::Null, "id must be a string, number or null")),
    };
    let echo = id.clone().unwrap_or(Value::Null);

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(Rejection::new(echo, "jsonrpc must be \"2.0\""));
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => return Err(Rejection::new(echo, "method must be a non-empty string")),
    };

    let params = match object.remove("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params,
        Some(_) => return Err(Rejection::new(echo, "params must be an object")),
    };

    Ok(RpcRequest { id, method, params })
}

/// `result` or `error`, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Result(Value),
    Error(RpcError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    #[serde(flatten)]
    pub payload: Payload,
    pub id: Value,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            payload: Payload::Result(result),
            id,
        }
    }

    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            payload: Payload::Error(error),
            id,
        }
    }

    pub fn as_error(&self) -> Option<&RpcError> {
        match &self.payload {
            Payload::Error(error) => Some(error),
            Payload::Result(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
