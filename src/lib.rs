//! # llm-conduit
//!
//! Provider-agnostic client layer for conversational LLM APIs: streaming
//! response normalization plus multi-round tool-call orchestration.
//!
//! Vendor transports live behind the [`ProviderAdapter`] trait and speak
//! a small vendor-neutral event alphabet; everything above that line is
//! uniform across providers:
//!
//! ```text
//!  ┌──────────────────────────────────────────────┐
//!  │            application / consumer            │
//!  └──────────────────────┬───────────────────────┘
//!                         │ StreamChunk / ModelResponse
//!  ┌──────────────────────┴───────────────────────┐
//!  │  ToolOrchestrator ── ToolController/Registry │
//!  │  StreamPipeline  ──  processors              │
//!  │  StreamHandler   ──  protocol state machine  │
//!  └──────────────────────┬───────────────────────┘
//!                         │ VendorEvent
//!  ┌──────────────────────┴───────────────────────┐
//!  │     ProviderAdapter (vendor HTTP / SSE)      │
//!  └──────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llm_conduit::{
//!     Message, OrchestrationContext, RequestParams, ToolController, ToolOrchestrator,
//!     ToolRegistry,
//! };
//! use llm_conduit::provider::DynProviderAdapter;
//!
//! # async fn example(adapter: Arc<dyn DynProviderAdapter>) -> Result<(), llm_conduit::ClientError> {
//! let params = RequestParams {
//!     model: "sonnet-large".into(),
//!     messages: vec![Message::user("What's the weather in Paris?")],
//!     ..Default::default()
//! };
//!
//! let controller = ToolController::new(Arc::new(ToolRegistry::new()));
//! let orchestrator = ToolOrchestrator::new(Arc::clone(&adapter), controller);
//!
//! let initial = adapter.call_boxed(&params).await?;
//! let mut ctx = OrchestrationContext::default();
//! let outcome = orchestrator
//!     .process_response(initial, params, None, &mut ctx)
//!     .await?;
//! println!("{}", outcome.response.content);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`error`] | Unified [`ClientError`] |
//! | [`message`] | Messages, tool calls, responses, transcript sanitizing |
//! | [`provider`] | The [`ProviderAdapter`] trait and vendor event alphabet |
//! | [`stream`] | The [`StreamHandler`] state machine and chunk pipeline |
//! | [`tool`] | Tool definitions, registry, controller |
//! | [`orchestrator`] | The multi-round tool loop |
//! | [`retry`] | Bounded exponential-backoff retry |
//! | [`usage`] | Token snapshots and microdollar cost accounting |
//! | [`history`] | The [`HistoryStore`](history::HistoryStore) seam |
//! | `mock` | Queue-based `MockAdapter` (behind the `test-utils` feature) |

#![warn(missing_docs)]

pub mod error;
pub mod history;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod retry;
pub mod stream;
pub mod tool;
pub mod usage;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// ── Core re-exports ────────────────────────────────────────────────
//
// Only the types that appear in nearly every program are re-exported
// at the crate root. Everything else lives in its submodule:
//
//   llm_conduit::stream::*   — chunks, pipeline, processors
//   llm_conduit::tool::*     — definitions, registry, controller
//   llm_conduit::provider::* — adapter traits, vendor events
//   llm_conduit::usage::*    — snapshots, Cost, ModelPricing
//   llm_conduit::history::*  — HistoryStore, InMemoryHistory
//   llm_conduit::mock::*     — MockAdapter (test-utils feature)

pub use error::ClientError;
pub use message::{FinishReason, Message, ModelResponse, Role, ToolCall};
pub use orchestrator::{OrchestrationOutcome, ToolOrchestrator};
pub use provider::{ProviderAdapter, RequestParams, ToolSpec};
pub use retry::{RetryManager, RetryPolicy};
pub use stream::{ChunkStream, StreamChunk, StreamHandler, StreamPipeline};
pub use tool::{
    OrchestrationContext, ToolController, ToolDefinition, ToolKind, ToolRegistry, tool_fn,
};
pub use usage::{Cost, ModelPricing, UsageSnapshot};
