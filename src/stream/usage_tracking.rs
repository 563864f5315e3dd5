//! Batched usage reporting.

use crate::usage::{UsageCallback, UsageSnapshot};

use super::{ChunkProcessor, StreamChunk};

/// Reports cumulative usage at token-batch boundaries and at completion.
///
/// Incremental snapshots are folded into a running total; whenever the
/// output tokens accumulated since the last report cross the batch
/// threshold, the callback fires with the cumulative total so far. The
/// callback always fires once more on the terminal chunk, after the
/// authoritative diff has been folded in, so the final invocation
/// reflects the provider's real accounting.
///
/// Chunks pass through unchanged.
pub struct UsageTrackingProcessor {
    callback: UsageCallback,
    batch_size: u64,
    total: UsageSnapshot,
    unreported_output: u64,
}

impl UsageTrackingProcessor {
    /// Default batch threshold, in output tokens.
    pub const DEFAULT_BATCH_SIZE: u64 = 25;

    /// Creates a tracker with the default batch threshold.
    pub fn new(callback: UsageCallback) -> Self {
        Self::with_batch_size(callback, Self::DEFAULT_BATCH_SIZE)
    }

    /// Creates a tracker that reports every `batch_size` output tokens.
    ///
    /// A `batch_size` of zero reports on every chunk that carries usage.
    pub fn with_batch_size(callback: UsageCallback, batch_size: u64) -> Self {
        Self {
            callback,
            batch_size,
            total: UsageSnapshot::default(),
            unreported_output: 0,
        }
    }
}

impl ChunkProcessor for UsageTrackingProcessor {
    fn process(&mut self, chunk: StreamChunk) -> StreamChunk {
        if let Some(usage) = &chunk.usage {
            self.total += usage;
            self.unreported_output += usage.output_tokens;
        }

        if chunk.is_complete {
            // Completion always reports, even if nothing accumulated.
            self.unreported_output = 0;
            (self.callback)(&self.total);
        } else if chunk.usage.is_some() && self.unreported_output >= self.batch_size {
            self.unreported_output = 0;
            (self.callback)(&self.total);
        }

        chunk
    }
}
