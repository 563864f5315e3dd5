//! Tool execution errors.

use std::error::Error;
use std::fmt;

/// An error produced by a tool handler or remote router.
///
/// Kept separate from [`ClientError`](crate::error::ClientError): tool
/// failures are reported back to the model as result text, not raised
/// through the orchestration loop.
#[derive(Debug)]
pub struct ToolError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ToolError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attaches an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ToolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn Error + 'static))
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("invalid tool arguments: {e}")).with_source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message() {
        let e = ToolError::new("database unavailable");
        assert_eq!(e.to_string(), "database unavailable");
    }

    #[test]
    fn test_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let e = ToolError::new("fetch failed").with_source(io);
        assert!(e.source().is_some());
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let e: ToolError = parse_err.into();
        assert!(e.to_string().contains("invalid tool arguments"));
    }
}
