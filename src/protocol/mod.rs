//! MCP protocol surface served by makemcp
//!
//! Only the server-side subset is modeled: initialize, ping, tools/list
//! and tools/call, plus the JSON-RPC envelope they ride on.

mod messages;
mod types;

pub use messages::*;
pub use types::*;

/// MCP protocol version supported by this server
pub const PROTOCOL_VERSION: &str = "2024-11-05";
