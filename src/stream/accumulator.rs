//! Cross-chunk accumulation with a shareable state handle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::message::{FinishReason, ToolCall};

use super::{ChunkProcessor, StreamChunk};

/// Everything accumulated from a stream so far.
///
/// Obtained through the handle returned by
/// [`ContentAccumulator::state`]; updated in place as chunks flow
/// through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedState {
    /// Concatenated content deltas.
    pub content: String,
    /// Concatenated reasoning deltas.
    pub reasoning: String,
    /// Fully resolved tool calls, populated by the terminal chunk.
    pub tool_calls: Vec<ToolCall>,
    /// Why the stream ended, once the terminal chunk has passed.
    pub finish_reason: Option<FinishReason>,
    /// Set when the terminal chunk has passed through.
    pub is_complete: bool,
    partial_calls: BTreeMap<u32, PartialCall>,
}

#[derive(Debug, Clone, Default)]
struct PartialCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl AccumulatedState {
    /// Tool calls whose fragments have fully arrived.
    ///
    /// A call counts as completed once its name is known and its
    /// argument buffer parses as a closed JSON document. Useful for
    /// starting tool work before the terminal chunk lands; after
    /// completion prefer [`tool_calls`](Self::tool_calls), which carries
    /// the authoritative resolution.
    pub fn completed_tool_calls(&self) -> Vec<ToolCall> {
        self.partial_calls
            .values()
            .filter_map(|partial| {
                let name = partial.name.clone()?;
                let arguments: Value = serde_json::from_str(&partial.arguments).ok()?;
                Some(ToolCall {
                    id: partial.id.clone().unwrap_or_default(),
                    name,
                    arguments,
                })
            })
            .collect()
    }

    fn absorb(&mut self, chunk: &StreamChunk) {
        self.content.push_str(&chunk.content);
        if let Some(reasoning) = &chunk.reasoning {
            self.reasoning.push_str(reasoning);
        }
        for delta in &chunk.tool_call_deltas {
            let partial = self.partial_calls.entry(delta.index).or_default();
            if let Some(id) = &delta.id {
                partial.id = Some(id.clone());
            }
            if let Some(name) = &delta.name {
                partial.name = Some(name.clone());
            }
            if let Some(fragment) = &delta.arguments_chunk {
                partial.arguments.push_str(fragment);
            }
        }
        if chunk.is_complete {
            self.is_complete = true;
            self.finish_reason = chunk.finish_reason;
            if let Some(calls) = &chunk.tool_calls {
                self.tool_calls = calls.clone();
            }
        }
    }
}

/// A pipeline processor that accumulates chunks into an
/// [`AccumulatedState`] shared with the caller.
///
/// The processor is a pure observer: chunks pass through unchanged.
/// Clone the handle from [`state`](Self::state) before moving the
/// accumulator into a pipeline.
#[derive(Debug, Default)]
pub struct ContentAccumulator {
    state: Arc<Mutex<AccumulatedState>>,
}

impl ContentAccumulator {
    /// Creates an accumulator with fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the shared state.
    pub fn state(&self) -> AccumulatorHandle {
        AccumulatorHandle {
            inner: Arc::clone(&self.state),
        }
    }
}

impl ChunkProcessor for ContentAccumulator {
    fn process(&mut self, chunk: StreamChunk) -> StreamChunk {
        lock_ignoring_poison(&self.state).absorb(&chunk);
        chunk
    }
}

/// A cloneable view onto a [`ContentAccumulator`]'s state.
#[derive(Debug, Clone)]
pub struct AccumulatorHandle {
    inner: Arc<Mutex<AccumulatedState>>,
}

impl AccumulatorHandle {
    /// Takes a point-in-time copy of the accumulated state.
    pub fn snapshot(&self) -> AccumulatedState {
        lock_ignoring_poison(&self.inner).clone()
    }
}

/// The guarded state holds no invariant across panics; recover the lock.
fn lock_ignoring_poison(m: &Mutex<AccumulatedState>) -> MutexGuard<'_, AccumulatedState> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
