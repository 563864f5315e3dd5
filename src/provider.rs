//! Provider adapter traits and request types.
//!
//! This module defines the boundary between the orchestration core and
//! vendor transports:
//!
//! - **[`ProviderAdapter`]** — the trait every backend implements. It
//!   uses Rust 2024's native async-fn-in-traits (AFIT), so
//!   implementations are straightforward `async fn`s with no macro
//!   overhead. The adapter owns all HTTP/SSE wire concerns; the core
//!   only sees [`VendorEvent`]s.
//!
//! - **[`DynProviderAdapter`]** — an object-safe mirror of
//!   `ProviderAdapter` that uses boxed futures. A blanket
//!   `impl<T: ProviderAdapter> DynProviderAdapter for T` bridges the
//!   two, so any concrete adapter can be stored as
//!   `Arc<dyn DynProviderAdapter>` with zero boilerplate.
//!
//! # The vendor-neutral event alphabet
//!
//! Adapters parse their native stream protocol (SSE lines, chunked JSON,
//! whatever) and translate it into [`VendorEvent`]s. The
//! [`StreamHandler`](crate::stream::StreamHandler) state machine consumes
//! that alphabet and emits normalized
//! [`StreamChunk`](crate::stream::StreamChunk)s — adapters never build
//! chunks themselves.

use std::future::Future;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::message::{Message, ModelResponse};

/// A pinned, boxed, `Send` stream of vendor-neutral events.
///
/// Produced by [`ProviderAdapter::stream_call`]; consumed by the
/// [`StreamHandler`](crate::stream::StreamHandler).
pub type VendorEventStream = Pin<Box<dyn Stream<Item = Result<VendorEvent, ClientError>> + Send>>;

/// A vendor-neutral stream event, as translated by a provider adapter.
///
/// Tool-call fragments are keyed by the provider's `item_id`; the stream
/// handler assigns each id a stable per-stream integer index on first
/// sighting so fragmented name/argument events can be correlated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum VendorEvent {
    /// A fragment of the model's text output.
    ContentDelta(String),
    /// A fragment of the model's reasoning (chain-of-thought) output.
    ReasoningDelta(String),
    /// Announces a new tool-call output item.
    ToolCallStart {
        /// Provider-assigned item identifier linking start → deltas.
        item_id: String,
        /// Provider-assigned call id (carried into the resolved call).
        call_id: String,
        /// The name of the tool being called.
        name: String,
    },
    /// A JSON fragment of a tool call's arguments.
    ToolCallArgsDelta {
        /// The item this fragment belongs to.
        item_id: String,
        /// A chunk of the JSON arguments string.
        chunk: String,
    },
    /// The provider finished the response normally.
    Completed {
        /// The provider's final token accounting, when reported.
        usage: Option<FinalUsage>,
    },
    /// The provider aborted the response.
    Failed {
        /// Provider-supplied failure description.
        message: String,
    },
    /// The response was cut short (token limit, content policy).
    Incomplete {
        /// Provider-supplied reason.
        reason: String,
    },
}

/// The provider's authoritative token totals, attached to
/// [`VendorEvent::Completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FinalUsage {
    /// Total prompt tokens.
    pub input_tokens: u64,
    /// Total completion tokens.
    pub output_tokens: u64,
    /// Total reasoning tokens, when the provider breaks them out.
    pub reasoning_tokens: u64,
}

/// A serializable tool descriptor sent to the model.
///
/// This is the wire-facing projection of a
/// [`ToolDefinition`](crate::tool::ToolDefinition) — name, description,
/// and parameter schema, with no execution payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// The tool's name as presented to the model.
    pub name: String,
    /// Description shown to the model so it knows when to use this tool.
    pub description: String,
    /// JSON Schema describing the tool's expected input.
    pub parameters: Value,
}

/// Parameters for a model request.
///
/// Most fields are optional — at minimum you need
/// [`messages`](Self::messages). Use struct-update syntax for concise
/// construction:
///
/// ```rust
/// use llm_conduit::{Message, RequestParams};
///
/// let params = RequestParams {
///     model: "sonnet-large".into(),
///     messages: vec![Message::user("Hello")],
///     max_tokens: Some(256),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestParams {
    /// The model identifier, interpreted by the adapter.
    pub model: String,
    /// The conversation transcript.
    pub messages: Vec<Message>,
    /// Tool descriptors the model may invoke.
    pub tools: Option<Vec<ToolSpec>>,
    /// Sampling temperature (0.0 = deterministic).
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
    /// System prompt, for providers that accept it separately from the
    /// message list.
    pub system: Option<String>,
}

/// The transport trait every vendor backend implements.
///
/// `ProviderAdapter` uses native async-fn-in-traits (Rust 2024 edition);
/// implementations are plain `async fn`s. Cross-cutting concerns such as
/// retry live outside the adapter — see
/// [`RetryManager`](crate::retry::RetryManager).
///
/// # Object safety
///
/// `ProviderAdapter` is **not** object-safe because AFIT returns
/// `impl Future`. When you need dynamic dispatch, use
/// [`DynProviderAdapter`] — every `ProviderAdapter` automatically
/// implements it via a blanket impl.
pub trait ProviderAdapter: Send + Sync {
    /// Sends a request and returns the complete response.
    fn call(
        &self,
        params: &RequestParams,
    ) -> impl Future<Output = Result<ModelResponse, ClientError>> + Send;

    /// Sends a request and returns a stream of vendor-neutral events.
    ///
    /// An `Err` here means the stream could not be established; failures
    /// after establishment arrive as `Err` items *inside* the stream and
    /// are converted to terminal chunks by the stream handler.
    fn stream_call(
        &self,
        params: &RequestParams,
    ) -> impl Future<Output = Result<VendorEventStream, ClientError>> + Send;

    /// Whether this adapter supports streaming at all.
    ///
    /// The orchestrator checks this before attempting a streaming
    /// resubmission; adapters without streaming report a terminal error
    /// chunk instead of panicking mid-loop.
    fn supports_streaming(&self) -> bool {
        true
    }
}

/// Object-safe counterpart of [`ProviderAdapter`] for dynamic dispatch.
///
/// You rarely implement this directly — the blanket
/// `impl<T: ProviderAdapter> DynProviderAdapter for T` does it for you.
pub trait DynProviderAdapter: Send + Sync {
    /// Boxed-future version of [`ProviderAdapter::call`].
    fn call_boxed<'a>(
        &'a self,
        params: &'a RequestParams,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, ClientError>> + Send + 'a>>;

    /// Boxed-future version of [`ProviderAdapter::stream_call`].
    fn stream_call_boxed<'a>(
        &'a self,
        params: &'a RequestParams,
    ) -> Pin<Box<dyn Future<Output = Result<VendorEventStream, ClientError>> + Send + 'a>>;

    /// Whether this adapter supports streaming.
    fn supports_streaming(&self) -> bool;
}

impl<T: ProviderAdapter> DynProviderAdapter for T {
    fn call_boxed<'a>(
        &'a self,
        params: &'a RequestParams,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, ClientError>> + Send + 'a>> {
        Box::pin(self.call(params))
    }

    fn stream_call_boxed<'a>(
        &'a self,
        params: &'a RequestParams,
    ) -> Pin<Box<dyn Future<Output = Result<VendorEventStream, ClientError>> + Send + 'a>> {
        Box::pin(self.stream_call(params))
    }

    fn supports_streaming(&self) -> bool {
        ProviderAdapter::supports_streaming(self)
    }
}
