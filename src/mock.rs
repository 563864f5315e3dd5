//! Mock adapter for testing.
//!
//! [`MockAdapter`] is a queue-based fake that lets tests control
//! exactly what responses and vendor events an adapter returns, without
//! touching the network. It implements [`ProviderAdapter`], so it works
//! anywhere a real adapter does — including through
//! [`DynProviderAdapter`](crate::provider::DynProviderAdapter) via the
//! blanket impl.
//!
//! # Why `MockError` instead of `ClientError`?
//!
//! [`ClientError`] contains `Box<dyn Error>` and is not `Clone`, so it
//! can't sit in a queue. [`MockError`] mirrors the common variants in a
//! cloneable form and converts at dequeue time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::ClientError;
use crate::message::ModelResponse;
use crate::provider::{ProviderAdapter, RequestParams, VendorEvent, VendorEventStream};

/// A queue-based mock adapter for unit and integration tests.
///
/// Push complete responses with [`queue_response`](Self::queue_response),
/// event scripts with [`queue_events`](Self::queue_events), and errors
/// with [`queue_error`](Self::queue_error) /
/// [`queue_stream_error`](Self::queue_stream_error). Each `call` /
/// `stream_call` pops from the front of the respective queue. Every call
/// records its [`RequestParams`] for later assertion via
/// [`recorded_calls`](Self::recorded_calls).
///
/// # Panics
///
/// `call` panics if the response queue is empty; `stream_call` panics if
/// the event-script queue is empty. An empty queue in a test is a test
/// bug, so it fails loudly.
#[derive(Default)]
pub struct MockAdapter {
    responses: Mutex<VecDeque<Result<ModelResponse, MockError>>>,
    event_scripts: Mutex<VecDeque<Result<Vec<VendorEvent>, MockError>>>,
    calls: Arc<Mutex<Vec<RequestParams>>>,
    streaming: bool,
}

/// Cloneable error subset for mock queuing.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Maps to [`ClientError::Http`].
    Http {
        /// HTTP status, if any.
        status: Option<http::StatusCode>,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`ClientError::StreamTransport`].
    Transport(String),
}

impl From<MockError> for ClientError {
    fn from(e: MockError) -> Self {
        match e {
            MockError::Http {
                status,
                message,
                retryable,
            } => ClientError::Http {
                status,
                message,
                retryable,
            },
            MockError::Transport(message) => ClientError::StreamTransport(message),
        }
    }
}

impl MockAdapter {
    /// Creates a mock with empty queues and streaming enabled.
    pub fn new() -> Self {
        Self {
            streaming: true,
            ..Self::default()
        }
    }

    /// Creates a mock that reports no streaming support.
    pub fn without_streaming() -> Self {
        Self {
            streaming: false,
            ..Self::default()
        }
    }

    /// Queues a complete response for the next `call`.
    pub fn queue_response(&self, response: ModelResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queues an error for the next `call`.
    pub fn queue_error(&self, error: MockError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Queues a vendor-event script for the next `stream_call`.
    pub fn queue_events(&self, events: Vec<VendorEvent>) {
        self.event_scripts.lock().unwrap().push_back(Ok(events));
    }

    /// Queues an establishment error for the next `stream_call`.
    pub fn queue_stream_error(&self, error: MockError) {
        self.event_scripts.lock().unwrap().push_back(Err(error));
    }

    /// The parameters of every `call` / `stream_call` so far.
    pub fn recorded_calls(&self) -> Vec<RequestParams> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProviderAdapter for MockAdapter {
    async fn call(&self, params: &RequestParams) -> Result<ModelResponse, ClientError> {
        self.calls.lock().unwrap().push(params.clone());
        let queued = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockAdapter response queue is empty");
        queued.map_err(Into::into)
    }

    async fn stream_call(&self, params: &RequestParams) -> Result<VendorEventStream, ClientError> {
        self.calls.lock().unwrap().push(params.clone());
        let queued = self
            .event_scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockAdapter event-script queue is empty");
        match queued {
            Ok(events) => Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok)))),
            Err(e) => Err(e.into()),
        }
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::StreamExt;

    use crate::message::{FinishReason, Message};

    #[tokio::test]
    async fn test_responses_pop_in_queue_order() {
        let mock = MockAdapter::new();
        mock.queue_response(ModelResponse {
            content: "first".into(),
            ..Default::default()
        });
        mock.queue_response(ModelResponse {
            content: "second".into(),
            ..Default::default()
        });

        let params = RequestParams::default();
        assert_eq!(mock.call(&params).await.unwrap().content, "first");
        assert_eq!(mock.call(&params).await.unwrap().content, "second");
    }

    #[tokio::test]
    async fn test_queued_error_converts() {
        let mock = MockAdapter::new();
        mock.queue_error(MockError::Http {
            status: Some(http::StatusCode::TOO_MANY_REQUESTS),
            message: "rate limited".into(),
            retryable: true,
        });
        let err = mock.call(&RequestParams::default()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_event_script_streams() {
        let mock = MockAdapter::new();
        mock.queue_events(vec![
            VendorEvent::ContentDelta("hi".into()),
            VendorEvent::Completed { usage: None },
        ]);
        let stream = mock.stream_call(&RequestParams::default()).await.unwrap();
        let events: Vec<_> = stream.map(Result::unwrap).collect().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_recorded_calls_capture_params() {
        let mock = MockAdapter::new();
        mock.queue_response(ModelResponse {
            finish_reason: FinishReason::Stop,
            ..Default::default()
        });
        let params = RequestParams {
            model: "test-model".into(),
            messages: vec![Message::user("hello")],
            ..Default::default()
        };
        mock.call(&params).await.unwrap();

        let recorded = mock.recorded_calls();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].model, "test-model");
    }

    #[test]
    fn test_without_streaming() {
        assert!(!MockAdapter::without_streaming().supports_streaming());
        assert!(MockAdapter::new().supports_streaming());
    }
}
