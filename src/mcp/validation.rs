//! Message checks run before dispatch.
//!
//! Incoming JSON is classified into a [`JsonRpcMessage`] by matching it
//! against one Draft 7 schema per message kind. Params of `initialize`,
//! `tools/call` and `resources/read` have their own schemas, and every
//! registered tool brings its `inputSchema`, compiled once at registration.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use anyhow::{Result, anyhow};
use jsonschema::{Draft, JSONSchema};
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::debug;

/// Compile a Draft 7 schema, naming it in the error
#[inline]
pub fn compile_schema(name: &str, schema: &Value) -> Result<JSONSchema> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|e| anyhow!("Failed to compile schema '{}': {}", name, e))
}

/// All violations of `schema`, each prefixed by its JSON pointer when not
/// at the root
fn violations(schema: &JSONSchema, value: &Value) -> Option<String> {
    let Err(errors) = schema.validate(value) else {
        return None;
    };
    let joined = errors
        .map(|e| match e.instance_path.to_string() {
            pointer if pointer.is_empty() => e.to_string(),
            pointer => format!("{}: {}", pointer, e),
        })
        .collect::<Vec<_>>()
        .join(", ");
    Some(joined)
}

fn check(name: &str, schema: &JSONSchema, value: &Value) -> Result<()> {
    match violations(schema, value) {
        None => Ok(()),
        Some(found) => Err(anyhow!("'{}' rejected: {}", name, found)),
    }
}

/// Envelope schemas, one per message kind
#[derive(Debug)]
struct Envelopes {
    request: JSONSchema,
    notification: JSONSchema,
    response: JSONSchema,
    error_response: JSONSchema,
}

impl Envelopes {
    fn compile() -> Result<Self> {
        let id = json!({ "oneOf": [{ "type": "string" }, { "type": "integer" }] });
        let version = json!({ "type": "string", "const": JSONRPC_VERSION });

        Ok(Self {
            request: compile_schema(
                "request",
                &json!({
                    "type": "object",
                    "properties": {
                        "jsonrpc": version,
                        "method": { "type": "string" },
                        "params": { "type": "object" },
                        "id": id
                    },
                    "required": ["jsonrpc", "method", "id"]
                }),
            )?,
            notification: compile_schema(
                "notification",
                &json!({
                    "type": "object",
                    "properties": {
                        "jsonrpc": version,
                        "method": { "type": "string" },
                        "params": { "type": "object" }
                    },
                    "required": ["jsonrpc", "method"],
                    "not": { "required": ["id"] }
                }),
            )?,
            response: compile_schema(
                "response",
                &json!({
                    "type": "object",
                    "properties": { "jsonrpc": version, "id": id },
                    "required": ["jsonrpc", "result", "id"]
                }),
            )?,
            error_response: compile_schema(
                "error response",
                &json!({
                    "type": "object",
                    "properties": {
                        "jsonrpc": version,
                        "error": {
                            "type": "object",
                            "properties": {
                                "code": { "type": "integer" },
                                "message": { "type": "string" }
                            },
                            "required": ["code", "message"]
                        },
                        "id": { "oneOf": [id, { "type": "null" }] }
                    },
                    "required": ["jsonrpc", "error", "id"]
                }),
            )?,
        })
    }
}

/// Envelope and params checks for the server's dispatcher
#[derive(Debug)]
pub struct McpValidator {
    envelopes: Envelopes,
    params: HashMap<&'static str, JSONSchema>,
}

impl McpValidator {
    #[inline]
    pub fn new() -> Result<Self> {
        let mut params = HashMap::new();

        // Hosts differ on whether they send capabilities at all
        params.insert(
            "initialize",
            compile_schema(
                "initialize",
                &json!({
                    "type": "object",
                    "properties": {
                        "protocolVersion": { "type": "string" },
                        "capabilities": { "type": "object" },
                        "clientInfo": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "version": { "type": "string" }
                            },
                            "required": ["name", "version"]
                        }
                    },
                    "required": ["protocolVersion", "clientInfo"]
                }),
            )?,
        );
        params.insert(
            "tools/call",
            compile_schema(
                "tools/call",
                &json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "arguments": { "type": "object" }
                    },
                    "required": ["name"]
                }),
            )?,
        );
        params.insert(
            "resources/read",
            compile_schema(
                "resources/read",
                &json!({
                    "type": "object",
                    "properties": { "uri": { "type": "string" } },
                    "required": ["uri"]
                }),
            )?,
        );

        debug!("Compiled params schemas for {} methods", params.len());
        Ok(Self {
            envelopes: Envelopes::compile()?,
            params,
        })
    }

    /// Classify a raw value as a JSON-RPC message.
    ///
    /// Params are left alone so that a request with bad params can still be
    /// answered under its own id.
    #[inline]
    pub fn validate_raw_message(&self, value: &Value) -> Result<JsonRpcMessage> {
        let envelopes = &self.envelopes;

        if envelopes.request.is_valid(value) {
            return Ok(JsonRpcMessage::Request(serde_json::from_value(
                value.clone(),
            )?));
        }
        if envelopes.notification.is_valid(value) {
            return Ok(JsonRpcMessage::Notification(serde_json::from_value(
                value.clone(),
            )?));
        }
        if envelopes.response.is_valid(value) {
            return Ok(JsonRpcMessage::Response(serde_json::from_value(
                value.clone(),
            )?));
        }
        if envelopes.error_response.is_valid(value) {
            return Ok(JsonRpcMessage::ErrorResponse(serde_json::from_value(
                value.clone(),
            )?));
        }

        // Report against the request shape, the one clients usually mean
        check("request", &envelopes.request, value)?;
        Err(anyhow!("Not a JSON-RPC 2.0 message"))
    }

    /// Check `params` of a method that has a schema; others pass.
    /// Absent params are checked as `{}`.
    #[inline]
    pub fn validate_params(&self, method: &str, params: Option<&Value>) -> McpResult<()> {
        let Some(schema) = self.params.get(method) else {
            return Ok(());
        };
        let empty = json!({});
        check(method, schema, params.unwrap_or(&empty)).map_err(|e| {
            McpError::InvalidParameters {
                message: e.to_string(),
            }
        })
    }

    /// Check tool arguments against the tool's compiled input schema
    #[inline]
    pub fn validate_tool_arguments(
        &self,
        tool_name: &str,
        schema: &JSONSchema,
        arguments: &Value,
    ) -> McpResult<()> {
        violations(schema, arguments).map_or(Ok(()), |message| {
            Err(McpError::InvalidToolParameters {
                tool: tool_name.to_string(),
                message,
            })
        })
    }

    /// The version to answer `initialize` with: the client's if we speak it,
    /// otherwise our latest
    #[inline]
    pub fn negotiate_protocol_version(&self, requested: &str) -> &'static str {
        SUPPORTED_PROTOCOL_VERSIONS
            .iter()
            .copied()
            .find(|v| *v == requested)
            .unwrap_or(MCP_VERSION)
    }
}
