//! HostTool trait definition

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ToolDescriptor;
use crate::protocol::CallToolResult;

/// A tool a host can serve
///
/// Failures are reported in the returned result (`isError: true`), never as
/// protocol errors.
#[async_trait]
pub trait HostTool: Send + Sync {
    /// Tool name as listed in the catalog
    fn name(&self) -> &'static str;

    /// One-line description for the model
    fn description(&self) -> &'static str;

    /// JSON Schema for the arguments
    fn input_schema(&self) -> Value;

    /// Run the tool
    async fn execute(&self, input: Value) -> CallToolResult;

    /// Catalog entry for this tool
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(self.name(), self.description(), self.input_schema())
    }
}
