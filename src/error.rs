//! Unified error type for all client operations.
//!
//! Every provider adapter maps its native failures into [`ClientError`],
//! giving callers a single type to match against regardless of which
//! backend is in use. Variants carry enough context for retry logic,
//! user-facing messages, and diagnostics.
//!
//! # Retryability
//!
//! Transport-level variants include a `retryable` flag that adapters set
//! based on the upstream response (e.g. HTTP 429 or 503). The
//! [`RetryManager`](crate::retry::RetryManager) inspects this flag via
//! [`ClientError::is_retryable`]:
//!
//! ```rust
//! use llm_conduit::ClientError;
//!
//! fn should_retry(err: &ClientError) -> bool {
//!     match err {
//!         ClientError::Http { retryable, .. } => *retryable,
//!         ClientError::Provider { retryable, .. } => *retryable,
//!         ClientError::Timeout { .. } => true,
//!         _ => false,
//!     }
//! }
//! ```
//!
//! # Stream errors vs. thrown errors
//!
//! Failures on an already-open stream are never raised as `Err` items:
//! the [`StreamHandler`](crate::stream::StreamHandler) converts them into
//! a terminal chunk with `FinishReason::Error` so consumers always see a
//! well-formed end. Only pre-output failures (stream establishment after
//! retries are exhausted) and [`IterationLimit`](Self::IterationLimit)
//! propagate as errors.

/// The unified error type returned by all client operations.
///
/// Variants are `#[non_exhaustive]` — new error kinds may be added in
/// minor releases without breaking downstream matches (always include a
/// wildcard arm).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// An HTTP-level failure (transport error, unexpected status code).
    ///
    /// `status` is `None` when the request never received a response
    /// (e.g. DNS failure, connection reset).
    #[error("HTTP error (status={status:?}): {message}")]
    Http {
        /// The HTTP status code, if one was received.
        status: Option<http::StatusCode>,
        /// A human-readable description of the failure.
        message: String,
        /// Whether the caller should retry this request.
        retryable: bool,
    },

    /// A provider-specific error that doesn't map to another variant.
    #[error("Provider error ({code}): {message}")]
    Provider {
        /// Provider-defined error code (e.g. `"overloaded"`).
        code: String,
        /// Human-readable error description.
        message: String,
        /// Whether the caller should retry this request.
        retryable: bool,
    },

    /// The stream transport failed after output had started.
    ///
    /// Surfaced as a terminal error chunk rather than an `Err` item when
    /// it occurs mid-stream; raised directly only during initial stream
    /// establishment.
    #[error("Stream transport error: {0}")]
    StreamTransport(String),

    /// The request was malformed (missing fields, invalid parameters).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A response body could not be parsed.
    #[error("Response format error: {message}")]
    ResponseFormat {
        /// What went wrong during parsing.
        message: String,
        /// The raw response body, for diagnostics.
        raw: String,
    },

    /// A named tool could not be resolved against any tool source.
    ///
    /// Recorded per call inside a
    /// [`ToolExecution`](crate::tool::ToolExecution) during orchestration;
    /// this variant is raised directly only by standalone resolution.
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    /// A tool invocation raised an error.
    #[error("Tool execution error ({tool_name}): {source}")]
    ToolExecution {
        /// The name of the tool that failed.
        tool_name: String,
        /// The underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The tool-call loop hit its configured iteration ceiling.
    ///
    /// This is the only tool failure that aborts the loop instead of
    /// being recorded inline. Call
    /// [`OrchestrationContext::reset`](crate::tool::OrchestrationContext::reset)
    /// to allow further calls on the same context.
    #[error("tool iteration limit reached (count: {count}, limit: {limit})")]
    IterationLimit {
        /// The iteration count at which the error was raised.
        count: u32,
        /// The configured maximum.
        limit: u32,
    },

    /// A retry policy exhausted its budget without a successful response.
    #[error("Retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last_error: Box<ClientError>,
    },

    /// The operation exceeded its deadline.
    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },

    /// Resubmission was required but the adapter has no way to continue
    /// (e.g. streaming resubmission without streaming support).
    #[error("No continuation available: {0}")]
    NoContinuation(String),
}

impl ClientError {
    /// Returns `true` if the error is transient and the request may succeed on retry.
    ///
    /// Checks the `retryable` flag on applicable variants and treats
    /// timeouts as always retryable.
    ///
    /// # Example
    ///
    /// ```rust
    /// use llm_conduit::ClientError;
    ///
    /// let err = ClientError::Timeout { elapsed_ms: 5000 };
    /// assert!(err.is_retryable());
    ///
    /// let err = ClientError::ToolNotFound("getWeather".into());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { retryable, .. } | Self::Provider { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseFormat {
            message: err.to_string(),
            raw: String::new(),
        }
    }
}
