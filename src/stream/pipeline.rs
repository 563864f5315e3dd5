//! Ordered chunk-processing pipeline.
//!
//! A [`StreamPipeline`] threads every chunk through its processors in
//! registration order. Processors observe and may transform chunks but
//! the pipeline itself never reorders, drops, or fabricates chunks, so
//! consumer-visible ordering is exactly the handler's ordering.

use futures::StreamExt;

use super::{ChunkStream, StreamChunk};

/// A stateful stage in a [`StreamPipeline`].
///
/// Implementations receive each chunk after the previous processor and
/// return the (possibly transformed) chunk to pass on. Most processors
/// are pure observers and return the chunk unchanged.
pub trait ChunkProcessor: Send {
    /// Processes one chunk, returning what the next stage should see.
    fn process(&mut self, chunk: StreamChunk) -> StreamChunk;
}

/// An ordered chain of [`ChunkProcessor`]s applied to a [`ChunkStream`].
///
/// ```rust,no_run
/// use llm_conduit::stream::{ContentAccumulator, StreamPipeline};
///
/// let accumulator = ContentAccumulator::new();
/// let state = accumulator.state();
/// let pipeline = StreamPipeline::new().with(accumulator);
/// # let _ = (state, pipeline);
/// ```
#[derive(Default)]
pub struct StreamPipeline {
    processors: Vec<Box<dyn ChunkProcessor>>,
}

impl StreamPipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a processor to the end of the chain.
    #[must_use]
    pub fn with(mut self, processor: impl ChunkProcessor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Appends a boxed processor to the end of the chain.
    pub fn push(&mut self, processor: Box<dyn ChunkProcessor>) {
        self.processors.push(processor);
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Returns `true` when no processors are registered.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Wraps a chunk stream so every `Ok` chunk flows through the chain.
    ///
    /// `Err` items pass through untouched; processor state persists for
    /// the lifetime of the returned stream.
    pub fn attach(self, stream: ChunkStream) -> ChunkStream {
        let mut processors = self.processors;
        Box::pin(stream.map(move |item| {
            item.map(|chunk| {
                processors
                    .iter_mut()
                    .fold(chunk, |chunk, p| p.process(chunk))
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    use crate::message::FinishReason;

    struct Uppercaser;

    impl ChunkProcessor for Uppercaser {
        fn process(&mut self, mut chunk: StreamChunk) -> StreamChunk {
            chunk.content = chunk.content.to_uppercase();
            chunk
        }
    }

    struct Suffixer(&'static str);

    impl ChunkProcessor for Suffixer {
        fn process(&mut self, mut chunk: StreamChunk) -> StreamChunk {
            if !chunk.content.is_empty() {
                chunk.content.push_str(self.0);
            }
            chunk
        }
    }

    struct Counter {
        seen: usize,
    }

    impl ChunkProcessor for Counter {
        fn process(&mut self, chunk: StreamChunk) -> StreamChunk {
            self.seen += 1;
            chunk
        }
    }

    fn source(chunks: Vec<StreamChunk>) -> ChunkStream {
        Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
    }

    #[tokio::test]
    async fn test_processors_run_in_registration_order() {
        let pipeline = StreamPipeline::new().with(Uppercaser).with(Suffixer("!"));
        let out: Vec<_> = pipeline
            .attach(source(vec![StreamChunk::content_delta("hi")]))
            .collect()
            .await;
        assert_eq!(out[0].as_ref().unwrap().content, "HI!");
    }

    #[tokio::test]
    async fn test_pipeline_preserves_chunk_count_and_order() {
        let chunks = vec![
            StreamChunk::content_delta("a"),
            StreamChunk::content_delta("b"),
            StreamChunk::terminal(FinishReason::Stop),
        ];
        let out: Vec<_> = StreamPipeline::new()
            .with(Counter { seen: 0 })
            .attach(source(chunks))
            .collect()
            .await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap().content, "a");
        assert_eq!(out[1].as_ref().unwrap().content, "b");
        assert!(out[2].as_ref().unwrap().is_complete);
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_identity() {
        let out: Vec<_> = StreamPipeline::new()
            .attach(source(vec![StreamChunk::content_delta("x")]))
            .collect()
            .await;
        assert_eq!(out[0].as_ref().unwrap().content, "x");
    }

    #[tokio::test]
    async fn test_err_items_bypass_processors() {
        let stream: ChunkStream = Box::pin(futures::stream::iter(vec![
            Err(crate::error::ClientError::StreamTransport("reset".into())),
            Ok(StreamChunk::content_delta("ok")),
        ]));
        let out: Vec<_> = StreamPipeline::new()
            .with(Uppercaser)
            .attach(stream)
            .collect()
            .await;
        assert!(out[0].is_err());
        assert_eq!(out[1].as_ref().unwrap().content, "OK");
    }

    #[test]
    fn test_len_and_is_empty() {
        let mut pipeline = StreamPipeline::new();
        assert!(pipeline.is_empty());
        pipeline.push(Box::new(Uppercaser));
        assert_eq!(pipeline.len(), 1);
    }
}
