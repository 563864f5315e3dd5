//! Messages, tool calls, and model responses.
//!
//! This is the shared vocabulary between the orchestration loop, the
//! stream pipeline, and provider adapters: a flat [`Message`] transcript
//! model ([`Role`] + content + optional tool-call payloads), the resolved
//! [`ToolCall`], and the non-streaming [`ModelResponse`].
//!
//! # Tool-call matching invariant
//!
//! An assistant message carrying tool calls must be followed in history
//! by one tool-role message per call id before the transcript is sent
//! back to the model — providers reject unmatched calls. Use
//! [`sanitize_for_submission`] to withhold offending assistant messages
//! rather than break the calling convention.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::usage::UsageSnapshot;

/// The author of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System / developer instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// A tool result, keyed by `tool_call_id`.
    Tool,
}

/// A resolved tool call extracted from a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned identifier, unique within one assistant turn.
    pub id: String,
    /// The name of the tool to invoke.
    pub name: String,
    /// Parsed JSON arguments. Malformed argument payloads resolve to an
    /// empty object rather than failing the call.
    pub arguments: Value,
}

/// One turn in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored this turn.
    pub role: Role,
    /// Text content (may be empty for pure tool-call turns).
    pub content: String,
    /// Tool calls issued by an assistant turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// For tool-role turns, the id of the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a plain-text assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates an assistant message carrying tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: if calls.is_empty() { None } else { Some(calls) },
            tool_call_id: None,
        }
    }

    /// Creates a tool-role message answering the given call id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FinishReason {
    /// Natural end of turn.
    #[default]
    Stop,
    /// The model requested tool execution. Outranks plain completion
    /// when function-call output items are present.
    ToolCalls,
    /// The response was truncated by the token limit.
    Length,
    /// The stream or request failed; partial output may precede this.
    Error,
}

/// A complete (non-streaming) model response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The assistant's text content.
    pub content: String,
    /// Reasoning (chain-of-thought) text, when the provider surfaces it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Resolved tool calls, in provider order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
    /// Authoritative usage for this response, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
}

impl ModelResponse {
    /// Returns `true` when this response requests tool execution.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Withholds assistant messages whose tool calls lack matching results.
///
/// Scans the transcript once; an assistant message carrying tool calls is
/// kept only if every call id has a later tool-role message answering it.
/// Withheld messages are logged at warn level — a withheld message means
/// the orchestration was interrupted between tool dispatch and result
/// append, and resubmitting it as-is would break the provider's calling
/// convention.
pub fn sanitize_for_submission(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .enumerate()
        .filter(|(idx, msg)| {
            let Some(calls) = &msg.tool_calls else {
                return true;
            };
            let matched = calls.iter().all(|call| {
                messages[idx + 1..].iter().any(|later| {
                    later.role == Role::Tool && later.tool_call_id.as_deref() == Some(&call.id)
                })
            });
            if !matched {
                tracing::warn!(
                    call_count = calls.len(),
                    "withholding assistant message with unmatched tool calls"
                );
            }
            matched
        })
        .map(|(_, msg)| msg.clone())
        .collect()
}
