//! Multi-round tool-call orchestration.
//!
//! The model asks for tools, the tools run, the results go back, and
//! the model answers again until a round produces no calls. The
//! orchestrator drives that loop in two shapes:
//!
//! - [`process_response`](ToolOrchestrator::process_response) — the
//!   non-streaming explicit loop over complete [`ModelResponse`]s.
//! - [`stream_process_response`](ToolOrchestrator::stream_process_response)
//!   — a phase machine built on `futures::stream::unfold` that yields
//!   every chunk of every round transparently, so a consumer sees one
//!   continuous chunk stream across resubmissions.
//!
//! Before every resubmission the transcript passes through
//! [`sanitize_for_submission`], withholding assistant messages whose
//! tool calls lack matching results.

use std::sync::Arc;

use futures::StreamExt;

use crate::error::ClientError;
use crate::message::{FinishReason, Message, ModelResponse, ToolCall, sanitize_for_submission};
use crate::provider::{DynProviderAdapter, RequestParams};
use crate::retry::RetryManager;
use crate::stream::{ChunkStream, StreamChunk, StreamHandler};
use crate::tool::{
    OrchestrationContext, ToolController, ToolDefinition, ToolExecution, executions_to_messages,
};
use crate::usage::{ModelPricing, estimate_tokens};

/// The result of a completed non-streaming orchestration.
#[derive(Debug, Clone)]
pub struct OrchestrationOutcome {
    /// The final model response (no tool calls).
    pub response: ModelResponse,
    /// Every tool execution across all rounds, in dispatch order.
    pub executions: Vec<ToolExecution>,
}

/// Drives the model → tools → resubmit loop.
#[derive(Clone)]
pub struct ToolOrchestrator {
    adapter: Arc<dyn DynProviderAdapter>,
    controller: ToolController,
    retry: RetryManager,
    pricing: Option<ModelPricing>,
}

impl ToolOrchestrator {
    /// Creates an orchestrator over the given adapter and controller.
    pub fn new(adapter: Arc<dyn DynProviderAdapter>, controller: ToolController) -> Self {
        Self {
            adapter,
            controller,
            retry: RetryManager::default(),
            pricing: None,
        }
    }

    /// Replaces the retry manager used for resubmissions.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryManager) -> Self {
        self.retry = retry;
        self
    }

    /// Attaches pricing for cost attribution on resubmission rounds.
    #[must_use]
    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Runs the non-streaming loop starting from an already-received
    /// response.
    ///
    /// Each round appends one assistant message carrying the calls and
    /// one tool message per result (original call order), sanitizes the
    /// transcript, and resubmits. Returns once a response has no tool
    /// calls, or fails with [`ClientError::IterationLimit`] when `ctx`
    /// runs out of rounds.
    pub async fn process_response(
        &self,
        initial: ModelResponse,
        mut params: RequestParams,
        call_scoped: Option<&[ToolDefinition]>,
        ctx: &mut OrchestrationContext,
    ) -> Result<OrchestrationOutcome, ClientError> {
        let mut response = initial;
        let mut all_executions = Vec::new();

        while response.has_tool_calls() {
            let executions = self
                .controller
                .process_tool_calls(&response.tool_calls, call_scoped, ctx)
                .await?;

            params.messages.push(Message::assistant_with_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            params.messages.extend(executions_to_messages(&executions));
            all_executions.extend(executions);

            params.messages = sanitize_for_submission(&params.messages);
            response = self
                .retry
                .execute(|| self.adapter.call_boxed(&params), ClientError::is_retryable)
                .await?;
        }

        Ok(OrchestrationOutcome {
            response,
            executions: all_executions,
        })
    }

    /// Runs the streaming loop starting from an already-open chunk
    /// stream.
    ///
    /// Every chunk of every round is yielded, including each round's
    /// terminal chunk; only the last round's terminal chunk carries no
    /// tool calls. Tool execution happens between rounds without
    /// emitting anything. A resubmission against an adapter with no
    /// streaming support ends the stream with a terminal error chunk;
    /// exceeding the iteration ceiling yields
    /// `Err(ClientError::IterationLimit)`.
    pub fn stream_process_response(
        &self,
        initial: ChunkStream,
        params: RequestParams,
        call_scoped: Option<Vec<ToolDefinition>>,
        ctx: OrchestrationContext,
    ) -> ChunkStream {
        let state = StreamLoopState {
            adapter: Arc::clone(&self.adapter),
            controller: self.controller.clone(),
            retry: self.retry.clone(),
            pricing: self.pricing.clone(),
            params,
            call_scoped,
            ctx,
            round_content: String::new(),
            phase: StreamPhase::Streaming(initial),
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            loop {
                match std::mem::replace(&mut state.phase, StreamPhase::Done) {
                    StreamPhase::Done => return None,
                    StreamPhase::Streaming(stream) => {
                        match phase_streaming(&mut state, stream).await {
                            PhaseResult::Yield(item, next) => {
                                state.phase = next;
                                return Some((item, state));
                            }
                            PhaseResult::Continue(next) => state.phase = next,
                        }
                    }
                    StreamPhase::ExecutingTools(calls) => {
                        match phase_executing_tools(&mut state, calls).await {
                            PhaseResult::Yield(item, next) => {
                                state.phase = next;
                                return Some((item, state));
                            }
                            PhaseResult::Continue(next) => state.phase = next,
                        }
                    }
                    StreamPhase::OpeningStream => match phase_opening_stream(&mut state).await {
                        PhaseResult::Yield(item, next) => {
                            state.phase = next;
                            return Some((item, state));
                        }
                        PhaseResult::Continue(next) => state.phase = next,
                    },
                }
            }
        });
        Box::pin(stream)
    }
}

impl std::fmt::Debug for ToolOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolOrchestrator")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

/// Phases of the streaming loop.
enum StreamPhase {
    /// Draining the current round's chunk stream.
    Streaming(ChunkStream),
    /// Running the tool calls the last terminal chunk requested.
    ExecutingTools(Vec<ToolCall>),
    /// Establishing the next round's stream.
    OpeningStream,
    /// Finished.
    Done,
}

enum PhaseResult {
    /// Yield an item and move to the next phase.
    Yield(Result<StreamChunk, ClientError>, StreamPhase),
    /// Move on without yielding.
    Continue(StreamPhase),
}

struct StreamLoopState {
    adapter: Arc<dyn DynProviderAdapter>,
    controller: ToolController,
    retry: RetryManager,
    pricing: Option<ModelPricing>,
    params: RequestParams,
    call_scoped: Option<Vec<ToolDefinition>>,
    ctx: OrchestrationContext,
    /// Assistant text accumulated over the current round, recorded in
    /// the transcript when the round requests tools.
    round_content: String,
    phase: StreamPhase,
}

async fn phase_streaming(state: &mut StreamLoopState, mut stream: ChunkStream) -> PhaseResult {
    match stream.next().await {
        Some(Ok(chunk)) => {
            state.round_content.push_str(&chunk.content);
            if chunk.signals_tool_calls() {
                let calls = chunk.tool_calls.clone().unwrap_or_default();
                PhaseResult::Yield(Ok(chunk), StreamPhase::ExecutingTools(calls))
            } else if chunk.is_complete {
                PhaseResult::Yield(Ok(chunk), StreamPhase::Done)
            } else {
                PhaseResult::Yield(Ok(chunk), StreamPhase::Streaming(stream))
            }
        }
        Some(Err(e)) => PhaseResult::Yield(Err(e), StreamPhase::Streaming(stream)),
        None => {
            // Normalized streams always end on a terminal chunk; running
            // dry without one means the round cannot be continued.
            tracing::warn!("round stream ended without terminal chunk");
            PhaseResult::Yield(
                Err(ClientError::NoContinuation(
                    "stream ended without a terminal chunk".into(),
                )),
                StreamPhase::Done,
            )
        }
    }
}

async fn phase_executing_tools(
    state: &mut StreamLoopState,
    calls: Vec<ToolCall>,
) -> PhaseResult {
    let executions = match state
        .controller
        .process_tool_calls(&calls, state.call_scoped.as_deref(), &mut state.ctx)
        .await
    {
        Ok(executions) => executions,
        Err(e) => return PhaseResult::Yield(Err(e), StreamPhase::Done),
    };

    let content = std::mem::take(&mut state.round_content);
    state
        .params
        .messages
        .push(Message::assistant_with_calls(content, calls));
    state
        .params
        .messages
        .extend(executions_to_messages(&executions));
    state.params.messages = sanitize_for_submission(&state.params.messages);

    PhaseResult::Continue(StreamPhase::OpeningStream)
}

async fn phase_opening_stream(state: &mut StreamLoopState) -> PhaseResult {
    if !state.adapter.supports_streaming() {
        tracing::warn!("adapter cannot stream the resubmission round");
        return PhaseResult::Yield(
            Ok(StreamChunk::terminal(FinishReason::Error)),
            StreamPhase::Done,
        );
    }

    // Resubmission failures are not blindly retried: partial output from
    // earlier rounds has already been consumed.
    let opened = state
        .retry
        .execute(|| state.adapter.stream_call_boxed(&state.params), |_| false)
        .await;

    match opened {
        Ok(events) => {
            let handler = StreamHandler::new(
                estimate_request_tokens(&state.params),
                state.pricing.clone(),
            );
            PhaseResult::Continue(StreamPhase::Streaming(handler.handle_stream(events)))
        }
        Err(e) => PhaseResult::Yield(Err(e), StreamPhase::Done),
    }
}

/// Rough prompt-token estimate for a resubmission round.
fn estimate_request_tokens(params: &RequestParams) -> u64 {
    let mut total = params
        .system
        .as_deref()
        .map(estimate_tokens)
        .unwrap_or_default();
    for message in &params.messages {
        total += estimate_tokens(&message.content);
    }
    total
}
