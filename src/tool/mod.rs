//! Tool definitions, resolution, and execution.
//!
//! A tool is either **local** (an in-process [`ToolHandler`]) or
//! **remote** (routed to an external server through a
//! [`RemoteToolRouter`] by server key and original name). Both kinds
//! share one [`ToolDefinition`] shape; the [`ToolKind`] tag carries the
//! execution payload, so a definition is always self-describing — no
//! side tables mapping names to transports.
//!
//! [`ToolController`] resolves and executes the calls of one model turn;
//! the iteration ceiling that bounds repeated turns lives in an
//! [`OrchestrationContext`] owned by the caller, not in controller
//! state, so one controller can serve many conversations.

mod controller;
mod error;
mod handler;
mod registry;

pub use controller::{ToolController, executions_to_messages};
pub use error::ToolError;
pub use handler::{FnToolHandler, ToolHandler, tool_fn};
pub use registry::{RemoteToolRouter, ToolRegistry};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::provider::ToolSpec;

/// How a tool executes.
#[derive(Clone)]
pub enum ToolKind {
    /// Executed in-process by the wrapped handler.
    Local(Arc<dyn ToolHandler>),
    /// Routed to an external server via a [`RemoteToolRouter`].
    Remote {
        /// Identifies the owning server to the router.
        server_key: String,
        /// The tool's name on that server (presented names may be
        /// namespaced to avoid collisions).
        original_name: String,
    },
}

impl std::fmt::Debug for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(_) => f.write_str("Local(..)"),
            Self::Remote {
                server_key,
                original_name,
            } => f
                .debug_struct("Remote")
                .field("server_key", server_key)
                .field("original_name", original_name)
                .finish(),
        }
    }
}

/// A complete tool description: what the model sees plus how it runs.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// The name presented to the model.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON Schema for the tool's input.
    pub parameters: Value,
    /// Execution payload.
    pub kind: ToolKind,
}

impl ToolDefinition {
    /// Creates a local tool definition.
    pub fn local(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            kind: ToolKind::Local(Arc::new(handler)),
        }
    }

    /// Creates a remote tool definition.
    pub fn remote(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        server_key: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            kind: ToolKind::Remote {
                server_key: server_key.into(),
                original_name: original_name.into(),
            },
        }
    }

    /// The wire-facing projection sent to the model.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Iteration bookkeeping for one orchestration, owned by the caller.
///
/// The controller increments [`iteration_count`](Self::iteration_count)
/// on every round and refuses to run past
/// [`max_iterations`](Self::max_iterations) until [`reset`](Self::reset)
/// is called. Keeping the counter outside the controller lets one
/// controller serve many concurrent conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationContext {
    /// Rounds consumed so far.
    pub iteration_count: u32,
    /// Ceiling on rounds before [`ClientError::IterationLimit`].
    pub max_iterations: u32,
}

impl OrchestrationContext {
    /// Default round ceiling.
    pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

    /// Creates a context with the given ceiling.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            iteration_count: 0,
            max_iterations,
        }
    }

    /// Consumes one round, failing once the ceiling is exceeded.
    pub(crate) fn begin_iteration(&mut self) -> Result<(), ClientError> {
        self.iteration_count += 1;
        if self.iteration_count > self.max_iterations {
            return Err(ClientError::IterationLimit {
                count: self.iteration_count,
                limit: self.max_iterations,
            });
        }
        Ok(())
    }

    /// Resets the counter for a new orchestration.
    pub fn reset(&mut self) {
        self.iteration_count = 0;
    }
}

impl Default for OrchestrationContext {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ITERATIONS)
    }
}

/// The record of one tool call within an orchestration round.
///
/// Exactly one of [`result`](Self::result) / [`error`](Self::error) is
/// set; errors are reported back to the model as result text rather
/// than aborting the round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    /// The provider-assigned call id.
    pub id: String,
    /// The tool name as called.
    pub name: String,
    /// The arguments the tool ran with.
    pub arguments: Value,
    /// Stringified tool output, on success.
    pub result: Option<String>,
    /// Error description, on failure.
    pub error: Option<String>,
}

impl ToolExecution {
    /// The text handed back to the model for this call.
    pub fn content(&self) -> &str {
        self.result
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("")
    }
}
