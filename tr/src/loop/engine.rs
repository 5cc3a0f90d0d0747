//! QueryLoop - drives one query through model calls and tool calls

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{LoopConfig, LoopError, LoopEvent, Transcript};
use crate::domain::{ToolDescriptor, ToolInvocationRequest, ToolInvocationResult, Turn};
use crate::llm::{LlmClient, ModelRequest, StopCondition, TokenUsage};
use crate::session::ToolHost;

/// Runs queries against a model, using a tool host for tool calls
///
/// The loop owns no connection: the host is borrowed per query and the model
/// client is stateless, so one `QueryLoop` can serve any number of queries.
pub struct QueryLoop {
    llm: Arc<dyn LlmClient>,
    config: LoopConfig,
    events: Option<mpsc::UnboundedSender<LoopEvent>>,
}

impl QueryLoop {
    pub fn new(llm: Arc<dyn LlmClient>, config: LoopConfig) -> Self {
        debug!(model = %llm.model(), ?config.max_turns, %config.refresh_catalog, "QueryLoop::new: called");
        Self {
            llm,
            config,
            events: None,
        }
    }

    /// Send progress events to `tx` while queries run
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<LoopEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Answer one user query
    ///
    /// The transcript is created here and discarded when the query ends.
    pub async fn process_query(&self, host: &dyn ToolHost, query: &str) -> Result<String, LoopError> {
        info!(query_len = %query.len(), "Processing query");
        let mut transcript = Transcript::new(query);
        self.run(host, &mut transcript).await
    }

    /// Drive `transcript` until the model ends its turn
    ///
    /// Every assistant turn is appended before its stop condition is looked at,
    /// so on error the transcript shows exactly what the model returned.
    pub async fn run(&self, host: &dyn ToolHost, transcript: &mut Transcript) -> Result<String, LoopError> {
        debug!(turns = %transcript.len(), "QueryLoop::run: called");
        let tools = self.catalog(host).await?;
        let mut model_calls: u32 = 0;
        let mut usage = TokenUsage::default();

        loop {
            if let Some(limit) = self.config.max_turns {
                if model_calls >= limit {
                    warn!(%limit, "Query reached its model call limit");
                    return Err(LoopError::TurnLimitExceeded { limit });
                }
            }
            model_calls += 1;

            let request = ModelRequest {
                system_prompt: self.config.system_prompt.clone(),
                turns: transcript.turns().to_vec(),
                tools: tools.clone(),
                max_tokens: self.config.max_tokens,
            };

            debug!(turn = %model_calls, "QueryLoop::run: calling model");
            self.emit(LoopEvent::ModelCallStarted { turn: model_calls });
            let response = self.llm.complete(request).await?;
            debug!(turn = %model_calls, stop = %response.stop, blocks = %response.blocks.len(), "QueryLoop::run: model responded");
            usage += response.usage;

            let has_tool_use = response.has_tool_use();
            transcript.push_assistant(response.blocks)?;

            match response.stop {
                StopCondition::NaturalEnd => {
                    if has_tool_use {
                        return Err(LoopError::InconsistentTurn(
                            "natural end with tool calls still pending".to_string(),
                        ));
                    }
                    let answer = transcript.last().map(Turn::text).unwrap_or_default();
                    info!(
                        %model_calls,
                        input_tokens = %usage.input_tokens,
                        output_tokens = %usage.output_tokens,
                        total_tokens = %usage.total(),
                        answer_len = %answer.len(),
                        "Query complete"
                    );
                    self.emit(LoopEvent::AnswerReady { model_calls, usage });
                    return Ok(answer);
                }
                StopCondition::ToolUseRequested => {
                    if !has_tool_use {
                        return Err(LoopError::InconsistentTurn(
                            "tool use requested without any tool calls".to_string(),
                        ));
                    }
                    let requests = transcript.last().map(Turn::tool_requests).unwrap_or_default();
                    let results = self.execute_tools(host, &requests).await?;
                    transcript.push_tool_results(results)?;
                }
                StopCondition::Other(raw) => {
                    warn!(%raw, "Model stopped for an unrecognized reason");
                    return Err(LoopError::UnrecognizedStopCondition { raw });
                }
            }
        }
    }

    /// Tools to offer the model for this query
    async fn catalog(&self, host: &dyn ToolHost) -> Result<Vec<ToolDescriptor>, LoopError> {
        if !self.config.refresh_catalog {
            if let Some(tools) = host.cached_catalog() {
                debug!(tool_count = %tools.len(), "QueryLoop::catalog: using cached catalog");
                return Ok(tools);
            }
        }
        let tools = host.list_tools().await?;
        debug!(tool_count = %tools.len(), "QueryLoop::catalog: listed tools");
        Ok(tools)
    }

    /// Execute every requested call in order
    ///
    /// A failure local to one call becomes that call's error result; the
    /// remaining calls still run. Session-level failures abort.
    async fn execute_tools(
        &self,
        host: &dyn ToolHost,
        requests: &[ToolInvocationRequest],
    ) -> Result<Vec<ToolInvocationResult>, LoopError> {
        debug!(tool_count = %requests.len(), "QueryLoop::execute_tools: called");
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            info!(tool = %request.tool_name, call_id = %request.call_id, "Calling tool");
            self.emit(LoopEvent::ToolCallStarted {
                call_id: request.call_id.clone(),
                tool_name: request.tool_name.clone(),
                arguments: request.arguments.clone(),
            });

            let result = match host.invoke_tool(&request.tool_name, request.arguments.clone()).await {
                Ok(output) => ToolInvocationResult::success(&request.call_id, output.content),
                Err(e) if e.is_call_local() => {
                    warn!(tool = %request.tool_name, error = %e, "Tool call failed, relaying error to model");
                    ToolInvocationResult::error(&request.call_id, e.to_string())
                }
                Err(e) => {
                    warn!(tool = %request.tool_name, error = %e, "Tool host failed, aborting query");
                    return Err(e.into());
                }
            };

            self.emit(LoopEvent::ToolCallFinished {
                call_id: request.call_id.clone(),
                tool_name: request.tool_name.clone(),
                is_error: result.is_error(),
            });
            results.push(result);
        }

        Ok(results)
    }

    fn emit(&self, event: LoopEvent) {
        if let Some(tx) = &self.events {
            debug!(event_type = event.event_type(), "QueryLoop::emit");
            // A closed receiver is fine
            let _ = tx.send(event);
        }
    }
}
