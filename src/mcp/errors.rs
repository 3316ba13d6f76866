//! Protocol-level errors and their JSON-RPC codes.
//!
//! Only routing failures live here. Tool-level failures (BigKinds down,
//! bad dates) become `isError` tool results instead.

use crate::mcp::protocol::*;
use thiserror::Error;
use tracing::{error, warn};

/// Failures of the JSON-RPC layer, each answered with an error object
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid Request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid params: {message}")]
    InvalidParameters { message: String },

    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidToolParameters { tool: String, message: String },

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: String },
}

impl McpError {
    /// JSON-RPC code sent to the client
    #[inline]
    pub const fn code(&self) -> i32 {
        match self {
            Self::ParseError { .. } => error_codes::PARSE_ERROR,
            Self::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
            Self::MethodNotFound { .. } => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParameters { .. } | Self::InvalidToolParameters { .. } => {
                error_codes::INVALID_PARAMS
            }
            Self::ToolExecutionFailed { .. } | Self::InternalError { .. } => {
                error_codes::INTERNAL_ERROR
            }
            Self::ToolNotFound { .. } => mcp_error_codes::TOOL_NOT_FOUND,
            Self::ResourceNotFound { .. } => mcp_error_codes::RESOURCE_NOT_FOUND,
        }
    }

    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        JsonRpcError::new(self.code(), self.to_string(), None)
    }

    /// Reply for request `id`; `None` when the id could not be read
    #[inline]
    pub fn to_error_response(&self, id: Option<RequestId>) -> JsonRpcMessage {
        JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(self.to_jsonrpc_error(), id))
    }

    /// Client mistakes at warn, our own failures at error
    #[inline]
    pub fn log(&self) {
        if self.code() == error_codes::INTERNAL_ERROR {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

impl From<anyhow::Error> for McpError {
    #[inline]
    fn from(error: anyhow::Error) -> Self {
        Self::InternalError {
            message: error.to_string(),
        }
    }
}

/// Malformed params surface as invalid-params, not parse errors
impl From<serde_json::Error> for McpError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidParameters {
            message: error.to_string(),
        }
    }
}
