//! Local tool handlers.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::ToolError;

/// A locally executed tool.
///
/// The trait is object-safe (boxed futures) so handlers can be stored as
/// `Arc<dyn ToolHandler>` inside a
/// [`ToolKind::Local`](super::ToolKind::Local). For simple tools prefer
/// [`tool_fn`], which wraps an async closure.
///
/// Handlers return a [`Value`]; the controller stringifies it before
/// handing it back to the model (strings pass through, `null` becomes
/// the empty string, everything else is serialized).
pub trait ToolHandler: Send + Sync {
    /// Executes the tool with parsed JSON arguments.
    fn execute<'a>(
        &'a self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;
}

/// A [`ToolHandler`] backed by an async closure. Created by [`tool_fn`].
pub struct FnToolHandler<F> {
    handler: F,
}

impl<F> std::fmt::Debug for FnToolHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnToolHandler").finish_non_exhaustive()
    }
}

impl<F, Fut> ToolHandler for FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    fn execute<'a>(
        &'a self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>> {
        Box::pin((self.handler)(arguments))
    }
}

/// Wraps an async closure as a [`ToolHandler`].
///
/// ```rust
/// use llm_conduit::tool::tool_fn;
/// use serde_json::json;
///
/// let handler = tool_fn(|args| async move {
///     let location = args["location"].as_str().unwrap_or("unknown").to_owned();
///     Ok(json!({"location": location, "temperature": 22}))
/// });
/// # let _ = handler;
/// ```
pub fn tool_fn<F, Fut>(handler: F) -> FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    FnToolHandler { handler }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_tool_fn_executes_closure() {
        let handler = tool_fn(|args| async move { Ok(json!({"echo": args})) });
        let out = handler.execute(json!({"x": 1})).await.unwrap();
        assert_eq!(out["echo"]["x"], 1);
    }

    #[tokio::test]
    async fn test_tool_fn_propagates_errors() {
        let handler = tool_fn(|_| async move { Err(ToolError::new("boom")) });
        let err = handler.execute(json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_handler_is_object_safe() {
        let handler: std::sync::Arc<dyn ToolHandler> =
            std::sync::Arc::new(tool_fn(|_| async move { Ok(Value::Null) }));
        let _ = handler;
    }
}
