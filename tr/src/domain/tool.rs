//! Tool catalog and invocation types
//!
//! A tool host declares a catalog of `ToolDescriptor`s. The model asks for
//! tools by name through `ToolInvocationRequest`s, and each request is answered
//! by exactly one `ToolInvocationResult` carrying the same `call_id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One operation offered by a tool host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique within one host's catalog
    pub name: String,

    /// Natural-language description shown to the model
    #[serde(default)]
    pub description: String,

    /// JSON schema describing valid arguments
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    /// Create a new tool descriptor
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        let name = name.into();
        debug!(%name, "ToolDescriptor::new: called");
        Self {
            name,
            description: description.into(),
            input_schema,
        }
    }
}

/// A content item returned by a tool host
///
/// The loop never looks inside these; they are relayed to the model as the
/// tool call's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "image")]
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    #[serde(rename = "resource")]
    Resource { resource: Value },

    /// Any content kind not listed above, kept as the host sent it
    #[serde(untagged)]
    Other(Value),
}

impl ToolContent {
    /// Create a text content item
    pub fn text(text: impl Into<String>) -> Self {
        ToolContent::Text { text: text.into() }
    }

    /// Plain-text rendering, used for terminal display and text-only providers
    pub fn to_display_string(&self) -> String {
        match self {
            ToolContent::Text { text } => text.clone(),
            ToolContent::Image { mime_type, data } => format!("[image {}, {} bytes base64]", mime_type, data.len()),
            ToolContent::Resource { resource } => resource
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| resource.to_string()),
            ToolContent::Other(raw) => raw.to_string(),
        }
    }
}

/// Successful output of a tool invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub content: Vec<ToolContent>,
}

impl ToolOutput {
    pub fn new(content: Vec<ToolContent>) -> Self {
        Self { content }
    }

    /// Concatenated text of every content item, one per line
    pub fn to_display_string(&self) -> String {
        self.content
            .iter()
            .map(ToolContent::to_display_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A tool call requested by the model inside an assistant turn
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// How a single tool call turned out
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Content produced by the tool
    Content(Vec<ToolContent>),

    /// The call failed; the detail is relayed to the model as the result
    Error(String),
}

/// Answer to one `ToolInvocationRequest`, correlated by `call_id`
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationResult {
    pub call_id: String,
    pub outcome: ToolOutcome,
}

impl ToolInvocationResult {
    /// Create a successful result
    pub fn success(call_id: impl Into<String>, content: Vec<ToolContent>) -> Self {
        debug!("ToolInvocationResult::success: called");
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Content(content),
        }
    }

    /// Create an error result
    pub fn error(call_id: impl Into<String>, detail: impl Into<String>) -> Self {
        debug!("ToolInvocationResult::error: called");
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Error(detail.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_deserializes_wire_schema_field() {
        let json = serde_json::json!({
            "name": "add",
            "description": "Add two numbers together",
            "inputSchema": {
                "type": "object",
                "properties": { "a": { "type": "number" }, "b": { "type": "number" } },
                "required": ["a", "b"]
            }
        });

        let tool: ToolDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(tool.name, "add");
        assert_eq!(tool.input_schema["required"][1], "b");
    }

    #[test]
    fn test_descriptor_missing_optional_fields() {
        let tool: ToolDescriptor = serde_json::from_value(serde_json::json!({ "name": "ping" })).unwrap();
        assert_eq!(tool.description, "");
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn test_tool_content_tagging() {
        let content: ToolContent =
            serde_json::from_value(serde_json::json!({ "type": "text", "text": "The sum of 2 and 3 is 5" })).unwrap();
        assert_eq!(content, ToolContent::text("The sum of 2 and 3 is 5"));

        let image: ToolContent =
            serde_json::from_value(serde_json::json!({ "type": "image", "data": "aGk=", "mimeType": "image/png" }))
                .unwrap();
        assert!(matches!(image, ToolContent::Image { ref mime_type, .. } if mime_type == "image/png"));
    }

    #[test]
    fn test_resource_display_prefers_text() {
        let content = ToolContent::Resource {
            resource: serde_json::json!({ "uri": "file:///README.md", "text": "# Hello" }),
        };
        assert_eq!(content.to_display_string(), "# Hello");
    }

    #[test]
    fn test_unlisted_content_kind_is_kept_raw() {
        let raw = serde_json::json!({ "type": "audio", "data": "UklGRg==", "mimeType": "audio/wav" });
        let content: ToolContent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(content, ToolContent::Other(raw.clone()));
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
        assert!(content.to_display_string().contains("audio/wav"));
    }

    #[test]
    fn test_output_display_joins_lines() {
        let output = ToolOutput::new(vec![ToolContent::text("one"), ToolContent::text("two")]);
        assert_eq!(output.to_display_string(), "one\ntwo");
    }

    #[test]
    fn test_invocation_result_error_flag() {
        assert!(ToolInvocationResult::error("c1", "boom").is_error());
        assert!(!ToolInvocationResult::success("c1", vec![]).is_error());
    }
}
