//! Model Context Protocol tool manifests.
//!
//! [`McpSpec`] turns a crawl's endpoints into one [`McpTool`] per operation,
//! with argument and response schemas, plus boilerplate auth and rate-limit
//! sections for import into an automation tool.

mod manifest;

pub use manifest::{
    MANIFEST_VERSION, McpAuth, McpSpec, McpTool, RateLimit, input_schema, manifest_name,
    output_schema, tool_for,
};
