//! Tool-call resolution and execution.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::error::ClientError;
use crate::message::{Message, ToolCall};

use super::{
    OrchestrationContext, RemoteToolRouter, ToolDefinition, ToolExecution, ToolKind, ToolRegistry,
};

/// Resolves and executes the tool calls of one model turn.
///
/// Resolution consults, in order:
///
/// 1. the call-scoped definitions by exact presented name,
/// 2. the call-scoped definitions by remote original name,
/// 3. the global registry by exact presented name,
/// 4. the global registry by remote original name.
///
/// A name that resolves nowhere produces a per-call error record (its
/// text contains "not found") so the model can react; it never aborts
/// the round. The only condition the controller raises is
/// [`ClientError::IterationLimit`], checked against the caller-owned
/// [`OrchestrationContext`] before any call runs.
#[derive(Clone)]
pub struct ToolController {
    registry: Arc<ToolRegistry>,
    router: Option<Arc<dyn RemoteToolRouter>>,
}

impl std::fmt::Debug for ToolController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolController")
            .field("registry", &self.registry)
            .field("has_router", &self.router.is_some())
            .finish()
    }
}

impl ToolController {
    /// Creates a controller over the given registry, with no remote
    /// routing.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            router: None,
        }
    }

    /// Attaches a router for [`ToolKind::Remote`] definitions.
    #[must_use]
    pub fn with_router(mut self, router: Arc<dyn RemoteToolRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Executes one round of tool calls.
    ///
    /// Consumes an iteration from `ctx` first, then runs all calls
    /// concurrently and collates the records back to call order.
    pub async fn process_tool_calls(
        &self,
        calls: &[ToolCall],
        call_scoped: Option<&[ToolDefinition]>,
        ctx: &mut OrchestrationContext,
    ) -> Result<Vec<ToolExecution>, ClientError> {
        ctx.begin_iteration()?;

        // join_all preserves input order, so records line up with calls.
        let executions = join_all(
            calls
                .iter()
                .map(|call| self.execute_one(call, call_scoped)),
        )
        .await;
        Ok(executions)
    }

    async fn execute_one(
        &self,
        call: &ToolCall,
        call_scoped: Option<&[ToolDefinition]>,
    ) -> ToolExecution {
        let arguments = effective_arguments(&call.arguments, &call.name);
        let mut execution = ToolExecution {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: arguments.clone(),
            result: None,
            error: None,
        };

        let Some(definition) = self.resolve(&call.name, call_scoped) else {
            tracing::warn!(tool = %call.name, "tool call did not resolve");
            execution.error = Some(ClientError::ToolNotFound(call.name.clone()).to_string());
            return execution;
        };

        match self.invoke(definition, arguments).await {
            Ok(value) => execution.result = Some(stringify_result(value)),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                execution.error = Some(e);
            }
        }
        execution
    }

    fn resolve<'a>(
        &'a self,
        name: &str,
        call_scoped: Option<&'a [ToolDefinition]>,
    ) -> Option<&'a ToolDefinition> {
        if let Some(scoped) = call_scoped {
            if let Some(def) = scoped.iter().find(|def| def.name == name) {
                return Some(def);
            }
            if let Some(def) = scoped.iter().find(|def| match &def.kind {
                ToolKind::Remote { original_name, .. } => original_name == name,
                ToolKind::Local(_) => false,
            }) {
                return Some(def);
            }
        }
        self.registry
            .get(name)
            .or_else(|| self.registry.get_by_original_name(name))
    }

    async fn invoke(
        &self,
        definition: &ToolDefinition,
        arguments: Value,
    ) -> Result<Value, String> {
        match &definition.kind {
            ToolKind::Local(handler) => handler
                .execute(arguments)
                .await
                .map_err(|e| e.to_string()),
            ToolKind::Remote {
                server_key,
                original_name,
            } => match &self.router {
                Some(router) => router
                    .call_tool(server_key, original_name, arguments)
                    .await
                    .map_err(|e| e.to_string()),
                None => Err(format!(
                    "remote tool '{}' requires a router but none is configured",
                    definition.name
                )),
            },
        }
    }
}

/// Normalizes call arguments to a JSON object.
///
/// Providers occasionally deliver arguments as a JSON-encoded string or
/// garbage; the tool still runs, with an empty object when nothing
/// usable arrives.
fn effective_arguments(arguments: &Value, tool: &str) -> Value {
    match arguments {
        Value::Object(_) => arguments.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Value::Object(map),
            _ => {
                tracing::warn!(tool, "malformed string arguments replaced with empty object");
                Value::Object(serde_json::Map::new())
            }
        },
        Value::Null => Value::Object(serde_json::Map::new()),
        _ => {
            tracing::warn!(tool, "non-object arguments replaced with empty object");
            Value::Object(serde_json::Map::new())
        }
    }
}

/// Stringifies a tool result for the model.
///
/// Strings pass through unquoted, `null` becomes the empty string, and
/// structured values are serialized.
fn stringify_result(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Converts execution records into tool-role messages, in call order.
pub fn executions_to_messages(executions: &[ToolExecution]) -> Vec<Message> {
    executions
        .iter()
        .map(|exec| Message::tool_result(exec.id.clone(), exec.content()))
        .collect()
}
