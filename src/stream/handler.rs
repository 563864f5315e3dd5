//! The stream protocol state machine.
//!
//! [`StreamHandler`] consumes a [`VendorEventStream`] and emits
//! normalized [`StreamChunk`]s, maintaining all cross-event state needed
//! to do so: content/reasoning accumulators, the item-id → index map for
//! fragmented tool calls, and the running token counters used to diff
//! the provider's final accounting against what was already reported
//! incrementally.
//!
//! All state lives for exactly one [`handle_stream`](StreamHandler::handle_stream)
//! invocation — nothing survives across streams.

use std::collections::{BTreeMap, HashMap, VecDeque};

use futures::StreamExt;
use serde_json::Value;

use crate::message::{FinishReason, ToolCall};
use crate::provider::{FinalUsage, VendorEvent, VendorEventStream};
use crate::usage::{ModelPricing, UsageSnapshot, estimate_tokens};

use super::{ChunkStream, StreamChunk, ToolCallDelta};

/// Converts vendor-neutral stream events into normalized chunks.
///
/// The handler guarantees that every produced stream ends with exactly
/// one terminal chunk: transport failures mid-stream, `Failed` /
/// `Incomplete` events, and even an event source that ends without a
/// completion event all surface as a well-formed terminal chunk instead
/// of a broken iterator.
///
/// # Example
///
/// ```rust,no_run
/// use llm_conduit::stream::StreamHandler;
/// use llm_conduit::provider::VendorEventStream;
///
/// fn normalize(events: VendorEventStream) -> llm_conduit::stream::ChunkStream {
///     StreamHandler::new(1200, None).handle_stream(events)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StreamHandler {
    /// Caller-supplied estimate of the request's prompt tokens, reported
    /// once on the first incremental snapshot.
    input_tokens: u64,
    /// Pricing for cost attribution on the authoritative snapshot.
    pricing: Option<ModelPricing>,
}

impl StreamHandler {
    /// Creates a handler for streams of the given request.
    pub fn new(input_tokens: u64, pricing: Option<ModelPricing>) -> Self {
        Self {
            input_tokens,
            pricing,
        }
    }

    /// Consumes a vendor event stream and produces normalized chunks.
    ///
    /// Per-stream state is created fresh on every call; the handler
    /// itself carries only request-level configuration and can be
    /// reused across streams.
    pub fn handle_stream(&self, events: VendorEventStream) -> ChunkStream {
        let state = HandlerState {
            source: events,
            machine: StreamState::new(self.input_tokens, self.pricing.clone()),
            pending: VecDeque::new(),
            finished: false,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    return Some((Ok(chunk), state));
                }
                if state.finished {
                    return None;
                }

                match state.source.next().await {
                    Some(Ok(event)) => {
                        state.machine.apply(event, &mut state.pending);
                        if state.machine.completed {
                            state.finished = true;
                        }
                    }
                    Some(Err(e)) => {
                        // Transport failure on an open stream: surface as
                        // a terminal chunk, never as an Err item.
                        tracing::warn!(error = %e, "stream source failed; emitting error terminal");
                        state.pending.push_back(state.machine.error_terminal());
                        state.finished = true;
                    }
                    None => {
                        if !state.machine.completed {
                            tracing::warn!("stream ended without completion event");
                            state.pending.push_back(state.machine.error_terminal());
                        }
                        state.finished = true;
                    }
                }
            }
        });

        Box::pin(stream)
    }
}

/// Unfold state: the source plus the per-stream machine.
struct HandlerState {
    source: VendorEventStream,
    machine: StreamState,
    pending: VecDeque<StreamChunk>,
    finished: bool,
}

/// Accumulation state for one in-flight tool call.
#[derive(Debug)]
struct ToolCallBuilder {
    call_id: String,
    name: String,
    arguments_buffer: String,
}

/// Per-stream accumulation state. Reset for every `handle_stream` call.
struct StreamState {
    accumulated_content: String,
    accumulated_reasoning: String,
    /// Provider item id → stable per-stream index.
    index_map: HashMap<String, u32>,
    next_index: u32,
    /// In-flight tool calls, ordered by index.
    builders: BTreeMap<u32, ToolCallBuilder>,
    /// Token counts already reported via incremental snapshots.
    reported_input: u64,
    reported_output: u64,
    reported_reasoning: u64,
    /// Request-level prompt estimate, reported on the first snapshot.
    input_tokens: u64,
    pricing: Option<ModelPricing>,
    completed: bool,
}

impl StreamState {
    fn new(input_tokens: u64, pricing: Option<ModelPricing>) -> Self {
        Self {
            accumulated_content: String::new(),
            accumulated_reasoning: String::new(),
            index_map: HashMap::new(),
            next_index: 0,
            builders: BTreeMap::new(),
            reported_input: 0,
            reported_output: 0,
            reported_reasoning: 0,
            input_tokens,
            pricing,
            completed: false,
        }
    }

    /// Applies one vendor event, pushing any produced chunks.
    fn apply(&mut self, event: VendorEvent, out: &mut VecDeque<StreamChunk>) {
        if self.completed {
            tracing::debug!(?event, "event after completion ignored");
            return;
        }

        match event {
            VendorEvent::ContentDelta(delta) => self.on_content_delta(delta, out),
            VendorEvent::ReasoningDelta(delta) => self.on_reasoning_delta(delta, out),
            VendorEvent::ToolCallStart {
                item_id,
                call_id,
                name,
            } => self.on_tool_call_start(item_id, call_id, name, out),
            VendorEvent::ToolCallArgsDelta { item_id, chunk } => {
                self.on_tool_args_delta(&item_id, chunk, out);
            }
            VendorEvent::Completed { usage } => self.on_completed(usage, out),
            VendorEvent::Failed { message } => {
                tracing::warn!(%message, "provider reported stream failure");
                out.push_back(self.terminal(FinishReason::Error, None));
                self.completed = true;
            }
            VendorEvent::Incomplete { reason } => {
                tracing::warn!(%reason, "provider reported incomplete response");
                out.push_back(self.terminal(FinishReason::Length, None));
                self.completed = true;
            }
        }
    }

    fn on_content_delta(&mut self, delta: String, out: &mut VecDeque<StreamChunk>) {
        if delta.is_empty() {
            return;
        }
        // Duplicate-event guard: some providers re-deliver the last delta
        // after a reconnect. Heuristic — a legitimately repeated trailing
        // fragment is also swallowed.
        if self.accumulated_content.ends_with(&delta) {
            tracing::debug!(len = delta.len(), "skipping trailing duplicate content delta");
            return;
        }
        self.accumulated_content.push_str(&delta);

        let estimate = estimate_tokens(&delta);
        let mut chunk = StreamChunk::content_delta(delta);
        chunk.usage = Some(self.incremental_snapshot(estimate, 0));
        self.reported_output += estimate;
        out.push_back(chunk);
    }

    fn on_reasoning_delta(&mut self, delta: String, out: &mut VecDeque<StreamChunk>) {
        if delta.is_empty() {
            return;
        }
        // Reasoning deltas are considered always-novel: never deduplicated.
        self.accumulated_reasoning.push_str(&delta);

        let estimate = estimate_tokens(&delta);
        let mut chunk = StreamChunk::default();
        chunk.reasoning = Some(delta);
        chunk.usage = Some(self.incremental_snapshot(0, estimate));
        self.reported_reasoning += estimate;
        out.push_back(chunk);
    }

    fn on_tool_call_start(
        &mut self,
        item_id: String,
        call_id: String,
        name: String,
        out: &mut VecDeque<StreamChunk>,
    ) {
        if self.index_map.contains_key(&item_id) {
            tracing::warn!(%item_id, "duplicate tool call start ignored");
            return;
        }
        let index = self.next_index;
        self.next_index += 1;
        self.index_map.insert(item_id, index);
        self.builders.insert(
            index,
            ToolCallBuilder {
                call_id: call_id.clone(),
                name: name.clone(),
                arguments_buffer: String::new(),
            },
        );

        let mut chunk = StreamChunk::default();
        chunk.tool_call_deltas.push(ToolCallDelta {
            index,
            id: Some(call_id),
            name: Some(name),
            arguments_chunk: None,
        });
        out.push_back(chunk);
    }

    fn on_tool_args_delta(
        &mut self,
        item_id: &str,
        fragment: String,
        out: &mut VecDeque<StreamChunk>,
    ) {
        // Out-of-order fragment for an unannounced item: log and drop,
        // never crash the stream.
        let Some(&index) = self.index_map.get(item_id) else {
            tracing::warn!(item_id, "arguments delta for unknown tool call item dropped");
            return;
        };
        if let Some(builder) = self.builders.get_mut(&index) {
            builder.arguments_buffer.push_str(&fragment);
        }

        let mut chunk = StreamChunk::default();
        chunk.tool_call_deltas.push(ToolCallDelta {
            index,
            id: None,
            name: None,
            arguments_chunk: Some(fragment),
        });
        out.push_back(chunk);
    }

    fn on_completed(&mut self, usage: Option<FinalUsage>, out: &mut VecDeque<StreamChunk>) {
        // Tool calls outrank plain completion.
        let finish = if self.builders.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        };
        out.push_back(self.terminal(finish, usage));
        self.completed = true;
    }

    /// Builds an incremental snapshot, reporting the request's input
    /// estimate exactly once.
    fn incremental_snapshot(&mut self, output: u64, reasoning: u64) -> UsageSnapshot {
        let input = if self.reported_input == 0 && self.input_tokens > 0 {
            self.reported_input = self.input_tokens;
            self.input_tokens
        } else {
            0
        };
        UsageSnapshot::incremental(input, output, reasoning)
    }

    /// Builds the terminal chunk: resolved tool calls plus the
    /// authoritative usage diff.
    ///
    /// Pending tool calls are resolved only when the round actually
    /// requests them; an error or truncation terminal must never carry
    /// calls, or a failed round would be executed and resubmitted.
    fn terminal(&mut self, finish_reason: FinishReason, actual: Option<FinalUsage>) -> StreamChunk {
        let calls = if finish_reason == FinishReason::ToolCalls {
            self.resolve_tool_calls()
        } else {
            Vec::new()
        };

        // Diff the provider's final totals against what incremental
        // snapshots already reported, so consumers summing snapshots
        // land exactly on the authoritative numbers.
        let usage = actual.map(|a| {
            let snapshot = UsageSnapshot::authoritative(
                a.input_tokens.saturating_sub(self.reported_input),
                a.output_tokens.saturating_sub(self.reported_output),
                a.reasoning_tokens.saturating_sub(self.reported_reasoning),
            );
            match &self.pricing {
                Some(p) => snapshot.with_pricing(p),
                None => snapshot,
            }
        });

        StreamChunk {
            tool_calls: if calls.is_empty() { None } else { Some(calls) },
            is_complete: true,
            finish_reason: Some(finish_reason),
            usage,
            ..Default::default()
        }
    }

    /// Terminal chunk for a failed source, carrying best-effort content.
    fn error_terminal(&mut self) -> StreamChunk {
        let mut chunk = self.terminal(FinishReason::Error, None);
        chunk.content = std::mem::take(&mut self.accumulated_content);
        self.completed = true;
        chunk
    }

    /// Drains the builders into resolved calls, in index order.
    ///
    /// An empty arguments buffer resolves to `{}`; an unparseable buffer
    /// also resolves to `{}` so the call reaches the tool rather than
    /// failing outright.
    fn resolve_tool_calls(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.builders)
            .into_values()
            .map(|builder| {
                let arguments = if builder.arguments_buffer.is_empty() {
                    Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(&builder.arguments_buffer).unwrap_or_else(|e| {
                        tracing::warn!(
                            tool = builder.name,
                            error = %e,
                            "unparseable tool arguments replaced with empty object"
                        );
                        Value::Object(serde_json::Map::new())
                    })
                };
                ToolCall {
                    id: builder.call_id,
                    name: builder.name,
                    arguments,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    use crate::error::ClientError;

    fn events(items: Vec<Result<VendorEvent, ClientError>>) -> VendorEventStream {
        Box::pin(futures::stream::iter(items))
    }

    async fn run(
        handler: &StreamHandler,
        items: Vec<Result<VendorEvent, ClientError>>,
    ) -> Vec<StreamChunk> {
        handler
            .handle_stream(events(items))
            .map(|r| r.expect("handler never yields Err"))
            .collect()
            .await
    }

    fn completed() -> VendorEvent {
        VendorEvent::Completed { usage: None }
    }

    #[tokio::test]
    async fn test_content_deltas_pass_through_in_order() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ContentDelta("Hello ".into())),
                Ok(VendorEvent::ContentDelta("world".into())),
                Ok(completed()),
            ],
        )
        .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "Hello ");
        assert_eq!(chunks[1].content, "world");
        assert!(chunks[2].is_complete);
        assert_eq!(chunks[2].finish_reason, Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_trailing_duplicate_delta_swallowed() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ContentDelta("abc".into())),
                Ok(VendorEvent::ContentDelta("abc".into())),
                Ok(completed()),
            ],
        )
        .await;

        // Second "abc" is a trailing duplicate — dropped.
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "abc");
    }

    #[tokio::test]
    async fn test_repeated_but_not_trailing_delta_kept() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ContentDelta("ha".into())),
                Ok(VendorEvent::ContentDelta(" no".into())),
                Ok(VendorEvent::ContentDelta("ha".into())),
                Ok(completed()),
            ],
        )
        .await;

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[2].content, "ha");
    }

    #[tokio::test]
    async fn test_reasoning_deltas_never_deduplicated() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ReasoningDelta("step".into())),
                Ok(VendorEvent::ReasoningDelta("step".into())),
                Ok(completed()),
            ],
        )
        .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].reasoning.as_deref(), Some("step"));
        assert_eq!(chunks[1].reasoning.as_deref(), Some("step"));
    }

    #[tokio::test]
    async fn test_tool_call_index_assignment() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallStart {
                    item_id: "item_b".into(),
                    call_id: "c1".into(),
                    name: "search".into(),
                }),
                Ok(VendorEvent::ToolCallStart {
                    item_id: "item_a".into(),
                    call_id: "c2".into(),
                    name: "fetch".into(),
                }),
                Ok(completed()),
            ],
        )
        .await;

        // Indices follow first-sighting order, not item id order.
        assert_eq!(chunks[0].tool_call_deltas[0].index, 0);
        assert_eq!(chunks[0].tool_call_deltas[0].name.as_deref(), Some("search"));
        assert_eq!(chunks[1].tool_call_deltas[0].index, 1);
        assert_eq!(chunks[1].tool_call_deltas[0].name.as_deref(), Some("fetch"));
    }

    #[tokio::test]
    async fn test_tool_call_arguments_assembled_on_terminal() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallStart {
                    item_id: "i0".into(),
                    call_id: "c1".into(),
                    name: "getWeather".into(),
                }),
                Ok(VendorEvent::ToolCallArgsDelta {
                    item_id: "i0".into(),
                    chunk: r#"{"location":"#.into(),
                }),
                Ok(VendorEvent::ToolCallArgsDelta {
                    item_id: "i0".into(),
                    chunk: r#""Paris"}"#.into(),
                }),
                Ok(completed()),
            ],
        )
        .await;

        let terminal = chunks.last().unwrap();
        assert!(terminal.is_complete);
        assert_eq!(terminal.finish_reason, Some(FinishReason::ToolCalls));
        let calls = terminal.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].arguments["location"], "Paris");
    }

    #[tokio::test]
    async fn test_unknown_item_args_delta_dropped() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallArgsDelta {
                    item_id: "ghost".into(),
                    chunk: "{}".into(),
                }),
                Ok(completed()),
            ],
        )
        .await;

        // Only the terminal chunk; the orphan fragment never crashes.
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_complete);
        assert_eq!(chunks[0].finish_reason, Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_malformed_arguments_resolve_to_empty_object() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallStart {
                    item_id: "i0".into(),
                    call_id: "c1".into(),
                    name: "search".into(),
                }),
                Ok(VendorEvent::ToolCallArgsDelta {
                    item_id: "i0".into(),
                    chunk: r#"{"q": unterminated"#.into(),
                }),
                Ok(completed()),
            ],
        )
        .await;

        let calls = chunks.last().unwrap().tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].arguments, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_no_args_tool_call_resolves_to_empty_object() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallStart {
                    item_id: "i0".into(),
                    call_id: "c1".into(),
                    name: "ping".into(),
                }),
                Ok(completed()),
            ],
        )
        .await;

        let calls = chunks.last().unwrap().tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].arguments, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_token_delta_invariant() {
        // Sum of all snapshots must equal the provider's final totals.
        let handler = StreamHandler::new(100, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ContentDelta("12345678".into())), // est 2
                Ok(VendorEvent::ContentDelta("abcd".into())),     // est 1
                Ok(VendorEvent::Completed {
                    usage: Some(FinalUsage {
                        input_tokens: 120,
                        output_tokens: 10,
                        reasoning_tokens: 0,
                    }),
                }),
            ],
        )
        .await;

        let mut total = UsageSnapshot::default();
        for chunk in &chunks {
            if let Some(u) = &chunk.usage {
                total += u;
            }
        }
        assert_eq!(total.input_tokens, 120);
        assert_eq!(total.output_tokens, 10);
        assert_eq!(total.reasoning_tokens, 0);
    }

    #[tokio::test]
    async fn test_authoritative_diff_never_negative() {
        // Estimates overshoot the provider's final count: the diff
        // saturates at zero instead of undercounting backwards.
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ContentDelta("a very long delta here".into())),
                Ok(VendorEvent::Completed {
                    usage: Some(FinalUsage {
                        input_tokens: 0,
                        output_tokens: 1,
                        reasoning_tokens: 0,
                    }),
                }),
            ],
        )
        .await;

        let terminal = chunks.last().unwrap().usage.as_ref().unwrap();
        assert!(!terminal.incremental);
        assert_eq!(terminal.output_tokens, 0);
    }

    #[tokio::test]
    async fn test_failed_event_becomes_error_terminal() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ContentDelta("partial".into())),
                Ok(VendorEvent::Failed {
                    message: "overloaded".into(),
                }),
            ],
        )
        .await;

        assert_eq!(chunks.len(), 2);
        let terminal = &chunks[1];
        assert!(terminal.is_complete);
        assert_eq!(terminal.finish_reason, Some(FinishReason::Error));
    }

    #[tokio::test]
    async fn test_failed_round_drops_pending_tool_calls() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallStart {
                    item_id: "i0".into(),
                    call_id: "c1".into(),
                    name: "getWeather".into(),
                }),
                Ok(VendorEvent::Failed {
                    message: "overloaded".into(),
                }),
            ],
        )
        .await;

        // The announced call never rides on the error terminal.
        let terminal = chunks.last().unwrap();
        assert_eq!(terminal.finish_reason, Some(FinishReason::Error));
        assert!(terminal.tool_calls.is_none());
        assert!(!terminal.signals_tool_calls());
    }

    #[tokio::test]
    async fn test_truncated_round_drops_pending_tool_calls() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallStart {
                    item_id: "i0".into(),
                    call_id: "c1".into(),
                    name: "getWeather".into(),
                }),
                Ok(VendorEvent::Incomplete {
                    reason: "max_output_tokens".into(),
                }),
            ],
        )
        .await;

        let terminal = chunks.last().unwrap();
        assert_eq!(terminal.finish_reason, Some(FinishReason::Length));
        assert!(terminal.tool_calls.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_event_becomes_length_terminal() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![Ok(VendorEvent::Incomplete {
                reason: "max_output_tokens".into(),
            })],
        )
        .await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].finish_reason, Some(FinishReason::Length));
    }

    #[tokio::test]
    async fn test_source_error_becomes_terminal_chunk() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ContentDelta("partial".into())),
                Err(ClientError::StreamTransport("connection reset".into())),
            ],
        )
        .await;

        assert_eq!(chunks.len(), 2);
        let terminal = &chunks[1];
        assert!(terminal.is_complete);
        assert_eq!(terminal.finish_reason, Some(FinishReason::Error));
        // Best-effort accumulated content rides on the error terminal.
        assert_eq!(terminal.content, "partial");
    }

    #[tokio::test]
    async fn test_source_exhaustion_without_completion() {
        let handler = StreamHandler::new(0, None);
        let chunks = run(&handler, vec![Ok(VendorEvent::ContentDelta("x".into()))]).await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].finish_reason, Some(FinishReason::Error));
    }

    #[tokio::test]
    async fn test_state_reset_between_streams() {
        let handler = StreamHandler::new(0, None);
        let first = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallStart {
                    item_id: "i0".into(),
                    call_id: "c1".into(),
                    name: "a".into(),
                }),
                Ok(completed()),
            ],
        )
        .await;
        assert_eq!(first[0].tool_call_deltas[0].index, 0);

        // Indices restart at zero on the next stream.
        let second = run(
            &handler,
            vec![
                Ok(VendorEvent::ToolCallStart {
                    item_id: "i9".into(),
                    call_id: "c9".into(),
                    name: "b".into(),
                }),
                Ok(completed()),
            ],
        )
        .await;
        assert_eq!(second[0].tool_call_deltas[0].index, 0);
    }

    #[tokio::test]
    async fn test_input_tokens_reported_once() {
        let handler = StreamHandler::new(50, None);
        let chunks = run(
            &handler,
            vec![
                Ok(VendorEvent::ContentDelta("one".into())),
                Ok(VendorEvent::ContentDelta("two".into())),
                Ok(completed()),
            ],
        )
        .await;

        assert_eq!(chunks[0].usage.as_ref().unwrap().input_tokens, 50);
        assert_eq!(chunks[1].usage.as_ref().unwrap().input_tokens, 0);
    }
}
