use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 error codes the outcome classification relies on.
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;

pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    pub fn to_body(&self) -> String {
        // Serialization of a struct with string/number/Value fields cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Structured error object carried by a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 response carrying either `result` or `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// A response is well-formed when it declares the protocol version and
    /// carries exactly one of `result` or `error`.
    pub fn is_well_formed(&self) -> bool {
        self.jsonrpc.as_deref() == Some(JSONRPC_VERSION)
            && (self.result.is_some() ^ self.error.is_some())
    }
}
