//! Streaming-response normalization.
//!
//! A provider stream flows through two stages before reaching the
//! consumer:
//!
//! ```text
//!   VendorEventStream          (adapter-owned wire events)
//!        │
//!   StreamHandler              — protocol state machine, emits chunks
//!        │
//!   StreamPipeline             — ordered stateful processors
//!        │
//!   ChunkStream                (consumer)
//! ```
//!
//! Chunks arrive in the exact order the provider produced them and are
//! immutable once yielded. Every stream ends with exactly one terminal
//! chunk (`is_complete: true`) — transport failures mid-stream become a
//! terminal chunk with [`FinishReason::Error`] rather than a broken
//! iterator, so partial output already delivered is never retracted.
//!
//! # Consuming a chunk stream
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use llm_conduit::stream::ChunkStream;
//!
//! async fn print_stream(mut stream: ChunkStream) {
//!     while let Some(chunk) = stream.next().await {
//!         match chunk {
//!             Ok(c) if c.is_complete => println!("\n[done: {:?}]", c.finish_reason),
//!             Ok(c) => print!("{}", c.content),
//!             Err(e) => eprintln!("stream error: {e}"),
//!         }
//!     }
//! }
//! ```

mod accumulator;
mod handler;
mod history;
mod pipeline;
mod usage_tracking;

pub use accumulator::{AccumulatedState, AccumulatorHandle, ContentAccumulator};
pub use handler::StreamHandler;
pub use history::StreamHistoryProcessor;
pub use pipeline::{ChunkProcessor, StreamPipeline};
pub use usage_tracking::UsageTrackingProcessor;

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::message::{FinishReason, ToolCall};
use crate::usage::UsageSnapshot;

/// A pinned, boxed, `Send` stream of normalized chunks.
///
/// Mid-stream transport failures arrive as `Ok` terminal chunks; only
/// pre-output failures and the tool iteration limit arrive as `Err`.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ClientError>> + Send>>;

/// A partial tool-call fragment, keyed by a stable per-stream index.
///
/// The index is assigned on first sighting of a provider item id within
/// a stream (monotonically increasing, reset per stream) and correlates
/// fragmented name/argument events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Stable per-stream index for this call.
    pub index: u32,
    /// The provider call id, present on the first fragment.
    pub id: Option<String>,
    /// The tool name, present on the first fragment.
    pub name: Option<String>,
    /// A chunk of the JSON arguments string.
    pub arguments_chunk: Option<String>,
}

/// One normalized slice of a streaming response.
///
/// Produced incrementally by the [`StreamHandler`]; immutable once
/// yielded; ordered by arrival.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text delta carried by this chunk (often empty).
    pub content: String,
    /// Reasoning delta carried by this chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Tool-call fragments carried by this chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_call_deltas: Vec<ToolCallDelta>,
    /// Fully resolved tool calls — terminal chunks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// `true` exactly once per stream, on the final chunk.
    pub is_complete: bool,
    /// Why the stream ended — terminal chunks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Usage attributed to this chunk (incremental estimate, or the
    /// authoritative completion diff on the terminal chunk).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
}

impl StreamChunk {
    /// A chunk carrying only a content delta.
    pub(crate) fn content_delta(delta: impl Into<String>) -> Self {
        Self {
            content: delta.into(),
            ..Self::default()
        }
    }

    /// A terminal chunk with the given finish reason.
    pub(crate) fn terminal(finish_reason: FinishReason) -> Self {
        Self {
            is_complete: true,
            finish_reason: Some(finish_reason),
            ..Self::default()
        }
    }

    /// Returns `true` when this terminal chunk requests tool execution.
    ///
    /// Requires [`FinishReason::ToolCalls`]: a terminal chunk that ended
    /// for any other reason never starts a tool round, whatever else it
    /// carries.
    pub fn signals_tool_calls(&self) -> bool {
        self.is_complete
            && self.finish_reason == Some(FinishReason::ToolCalls)
            && self
                .tool_calls
                .as_ref()
                .is_some_and(|calls| !calls.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_chunk_default_is_not_terminal() {
        let c = StreamChunk::default();
        assert!(!c.is_complete);
        assert!(c.finish_reason.is_none());
        assert!(!c.signals_tool_calls());
    }

    #[test]
    fn test_terminal_chunk_finish_reason() {
        let c = StreamChunk::terminal(FinishReason::Length);
        assert!(c.is_complete);
        assert_eq!(c.finish_reason, Some(FinishReason::Length));
    }

    #[test]
    fn test_signals_tool_calls_requires_terminal() {
        let mut c = StreamChunk::default();
        c.tool_calls = Some(vec![ToolCall {
            id: "c1".into(),
            name: "search".into(),
            arguments: serde_json::json!({}),
        }]);
        assert!(!c.signals_tool_calls());
        c.is_complete = true;
        assert!(!c.signals_tool_calls());
        c.finish_reason = Some(FinishReason::ToolCalls);
        assert!(c.signals_tool_calls());
    }

    #[test]
    fn test_signals_tool_calls_empty_list() {
        let mut c = StreamChunk::terminal(FinishReason::ToolCalls);
        c.tool_calls = Some(vec![]);
        assert!(!c.signals_tool_calls());
    }

    #[test]
    fn test_error_terminal_never_signals_tool_calls() {
        let mut c = StreamChunk::terminal(FinishReason::Error);
        c.tool_calls = Some(vec![ToolCall {
            id: "c1".into(),
            name: "search".into(),
            arguments: serde_json::json!({}),
        }]);
        assert!(!c.signals_tool_calls());
    }

    #[test]
    fn test_chunk_serde_roundtrip() {
        let c = StreamChunk {
            content: "hello".into(),
            tool_call_deltas: vec![ToolCallDelta {
                index: 0,
                id: Some("c1".into()),
                name: Some("search".into()),
                arguments_chunk: None,
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&c).unwrap();
        let back: StreamChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }

    #[tokio::test]
    async fn test_chunk_stream_collect() {
        let chunks = vec![
            Ok(StreamChunk::content_delta("hello ")),
            Ok(StreamChunk::content_delta("world")),
            Ok(StreamChunk::terminal(FinishReason::Stop)),
        ];
        let stream: ChunkStream = Box::pin(futures::stream::iter(chunks));
        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 3);
        assert!(collected.iter().all(Result::is_ok));
    }

    #[test]
    fn test_chunk_stream_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ChunkStream>();
    }
}
