//! Anthropic Claude API client implementation
//!
//! Implements the LlmClient trait for Anthropic's Messages API. Each call is a
//! single blocking POST; failures are returned as-is, never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{LlmClient, LlmError, ModelRequest, ModelTurn, StopCondition, TokenUsage};
use crate::config::LlmConfig;
use crate::domain::{ContentBlock, ToolContent, ToolDescriptor, ToolInvocationResult, ToolOutcome, Turn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude API client
pub struct AnthropicClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config.api_key().ok_or_else(|| LlmError::MissingApiKey {
            env: config.api_key_env.clone(),
        })?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the Anthropic API
    fn build_request_body(&self, request: &ModelRequest) -> serde_json::Value {
        debug!(%self.model, turns = %request.turns.len(), "build_request_body: called");
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens.min(self.max_tokens),
            "messages": self.convert_turns(&request.turns),
        });

        if let Some(system) = &request.system_prompt {
            body["system"] = serde_json::json!(system);
        }

        if !request.tools.is_empty() {
            debug!(tool_count = %request.tools.len(), "build_request_body: adding tools");
            body["tools"] = serde_json::json!(request.tools.iter().map(tool_schema).collect::<Vec<_>>());
        }

        body
    }

    /// Convert transcript turns to Anthropic messages
    ///
    /// Tool results travel as a user message made of tool_result blocks.
    fn convert_turns(&self, turns: &[Turn]) -> Vec<serde_json::Value> {
        turns
            .iter()
            .map(|turn| match turn {
                Turn::User { content } => serde_json::json!({
                    "role": "user",
                    "content": content,
                }),
                Turn::Assistant { blocks } => serde_json::json!({
                    "role": "assistant",
                    "content": blocks.iter().map(convert_content_block).collect::<Vec<_>>(),
                }),
                Turn::ToolResults { results } => serde_json::json!({
                    "role": "user",
                    "content": results.iter().map(convert_tool_result).collect::<Vec<_>>(),
                }),
            })
            .collect()
    }

    /// Parse the Anthropic API response
    fn parse_response(&self, api_response: AnthropicResponse) -> ModelTurn {
        debug!(stop_reason = ?api_response.stop_reason, "parse_response: called");
        let blocks = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(ContentBlock::Text { text }),
                AnthropicContentBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse {
                    call_id: id,
                    tool_name: name,
                    arguments: input,
                }),
                AnthropicContentBlock::Unsupported => {
                    debug!("parse_response: skipping unsupported content block");
                    None
                }
            })
            .collect();

        let stop = match api_response.stop_reason.as_deref() {
            Some(reason) => StopCondition::from_anthropic(reason),
            None => StopCondition::Other("none".to_string()),
        };

        ModelTurn {
            blocks,
            stop,
            usage: TokenUsage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
            },
        }
    }
}

fn tool_schema(tool: &ToolDescriptor) -> serde_json::Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

fn convert_content_block(block: &ContentBlock) -> serde_json::Value {
    match block {
        ContentBlock::Text { text } => serde_json::json!({
            "type": "text",
            "text": text,
        }),
        ContentBlock::ToolUse {
            call_id,
            tool_name,
            arguments,
        } => serde_json::json!({
            "type": "tool_use",
            "id": call_id,
            "name": tool_name,
            "input": arguments,
        }),
    }
}

fn convert_tool_result(result: &ToolInvocationResult) -> serde_json::Value {
    match &result.outcome {
        ToolOutcome::Content(items) => serde_json::json!({
            "type": "tool_result",
            "tool_use_id": result.call_id,
            "content": items.iter().map(convert_tool_content).collect::<Vec<_>>(),
        }),
        ToolOutcome::Error(detail) => serde_json::json!({
            "type": "tool_result",
            "tool_use_id": result.call_id,
            "content": detail,
            "is_error": true,
        }),
    }
}

fn convert_tool_content(content: &ToolContent) -> serde_json::Value {
    match content {
        ToolContent::Text { text } => serde_json::json!({
            "type": "text",
            "text": text,
        }),
        ToolContent::Image { data, mime_type } => serde_json::json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": mime_type,
                "data": data,
            },
        }),
        ToolContent::Resource { .. } | ToolContent::Other(_) => serde_json::json!({
            "type": "text",
            "text": content.to_display_string(),
        }),
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: ModelRequest) -> Result<ModelTurn, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(url)
            .header("x-api-key", self.api_key.clone())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();

        if status == 429 {
            debug!("complete: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !response.status().is_success() {
            debug!(%status, "complete: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        let api_response: AnthropicResponse = response.json().await?;
        debug!("complete: success");
        Ok(self.parse_response(api_response))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Anthropic API response types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
