//! MCP (Model Context Protocol) Server Implementation
//!
//! JSON-RPC 2.0 server exposing the news tools and widget resources over
//! stdio or HTTP. Supports protocol versions 2025-06-18, 2025-03-26 and
//! 2024-11-05.


pub mod errors;
pub mod http;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod validation;

pub use errors::{McpError, McpResult};
pub use server::{ConnectionState, HealthStatus, McpServer, ResourceHandler, ToolHandler};
