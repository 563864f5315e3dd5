//! Global tool registry and remote routing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::provider::ToolSpec;

use super::{ToolDefinition, ToolError, ToolKind};

/// A registry of tool definitions, indexed by presented name.
///
/// The registry is the fallback scope of tool resolution: call-scoped
/// definitions are consulted first, then the registry by exact name,
/// then the registry by remote `original_name`.
///
/// Cloning is cheap — local handlers are held behind `Arc`.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition under its presented name.
    ///
    /// Re-registering a name replaces the previous definition.
    pub fn register(&mut self, definition: ToolDefinition) {
        self.tools.insert(definition.name.clone(), definition);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, definition: ToolDefinition) -> Self {
        self.register(definition);
        self
    }

    /// Looks up a definition by exact presented name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Looks up a remote definition by its server-side original name.
    ///
    /// Presented names are often namespaced (`server__tool`) while the
    /// model occasionally emits the bare original; this lookup covers
    /// that mismatch.
    pub fn get_by_original_name(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.values().find(|def| match &def.kind {
            ToolKind::Remote { original_name, .. } => original_name == name,
            ToolKind::Local(_) => false,
        })
    }

    /// Iterates over every registered definition.
    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    /// Wire-facing descriptors for every registered tool.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.definitions().map(ToolDefinition::spec).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` when no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Routes remote tool calls to their owning server.
///
/// The client layer never speaks the remote protocol itself; it hands
/// the server key, the server-side tool name, and the arguments to the
/// router and gets a JSON result back.
pub trait RemoteToolRouter: Send + Sync {
    /// Invokes `original_name` on the server identified by `server_key`.
    fn call_tool<'a>(
        &'a self,
        server_key: &'a str,
        original_name: &'a str,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tool::tool_fn;
    use serde_json::json;

    fn local(name: &str) -> ToolDefinition {
        ToolDefinition::local(
            name,
            "a test tool",
            json!({"type": "object"}),
            tool_fn(|_| async move { Ok(Value::Null) }),
        )
    }

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new().with(local("search"));
        assert!(registry.get("search").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(local("search"));
        registry.register(ToolDefinition::remote(
            "search",
            "remote now",
            json!({"type": "object"}),
            "srv",
            "search",
        ));
        assert_eq!(registry.len(), 1);
        assert!(matches!(
            registry.get("search").unwrap().kind,
            ToolKind::Remote { .. }
        ));
    }

    #[test]
    fn test_get_by_original_name() {
        let registry = ToolRegistry::new().with(ToolDefinition::remote(
            "weather__lookup",
            "weather lookup",
            json!({"type": "object"}),
            "weather",
            "lookup",
        ));
        let def = registry.get_by_original_name("lookup").unwrap();
        assert_eq!(def.name, "weather__lookup");
        // Local tools are never matched by original name.
        let registry = ToolRegistry::new().with(local("lookup"));
        assert!(registry.get_by_original_name("lookup").is_none());
    }

    #[test]
    fn test_specs_carry_no_execution_payload() {
        let registry = ToolRegistry::new().with(local("search"));
        assert_eq!(registry.definitions().count(), 1);
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "search");
        assert_eq!(specs[0].parameters, json!({"type": "object"}));
    }
}
