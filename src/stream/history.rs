//! History recording from inside the pipeline.

use std::sync::Arc;

use crate::history::HistoryStore;
use crate::message::Message;

use super::{ChunkProcessor, StreamChunk};

/// Appends the finalized assistant message to a [`HistoryStore`] when
/// the terminal chunk passes through.
///
/// Content is accumulated across the stream; on the terminal chunk one
/// assistant message is written carrying the full text and any resolved
/// tool calls. Reasoning deltas are ephemeral and never enter the
/// transcript. Nothing is written for streams that never complete (the
/// processor is dropped with the pipeline).
pub struct StreamHistoryProcessor {
    store: Arc<dyn HistoryStore>,
    content: String,
    recorded: bool,
}

impl StreamHistoryProcessor {
    /// Creates a processor writing to the given store.
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            content: String::new(),
            recorded: false,
        }
    }
}

impl ChunkProcessor for StreamHistoryProcessor {
    fn process(&mut self, chunk: StreamChunk) -> StreamChunk {
        self.content.push_str(&chunk.content);

        if chunk.is_complete && !self.recorded {
            self.recorded = true;
            let calls = chunk.tool_calls.clone().unwrap_or_default();
            self.store
                .append(Message::assistant_with_calls(self.content.clone(), calls));
        }
        chunk
    }
}
