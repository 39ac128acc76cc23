//! Bus message definitions.
//!
//! Three messages cross the facade/orchestrator boundary:
//!
//! - `SubmitPrompt` (facade → orchestrator), acknowledged with `SubmitAck`
//! - `CapturedResponse` (orchestrator → facade), fire-and-forget
//!
//! Every message carries a [`CorrelationId`] end to end; a response without a
//! registered listener for its id is dropped, never broadcast.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;

/// Correlation identifier tagging one logical prompt request.
pub type CorrelationId = Uuid;

/// Descriptor of a located page context hosting the target application.
///
/// Re-resolved on every request; the tab may close or navigate between
/// calls, so a cached descriptor is never trusted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetContext {
    /// DevTools target id of the page.
    pub target_id: String,
    /// Page URL at the time of location.
    pub url: String,
}

impl TargetContext {
    pub fn new(target_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            url: url.into(),
        }
    }
}

/// How the injection routine set the input content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InjectionMethod {
    /// Structured editor API (dispatch on the framework's view object).
    EditorApi,
    /// Raw DOM writes plus synthetic input events.
    DomManipulation,
}

impl std::fmt::Display for InjectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InjectionMethod::EditorApi => write!(f, "editor-api"),
            InjectionMethod::DomManipulation => write!(f, "dom-manipulation"),
        }
    }
}

/// Outcome of one injection attempt. Produced once, consumed immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionResult {
    pub success: bool,
    pub method: InjectionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InjectionResult {
    pub fn succeeded(method: InjectionMethod) -> Self {
        Self {
            success: true,
            method,
            error: None,
        }
    }

    pub fn failed(method: InjectionMethod, error: impl Into<String>) -> Self {
        Self {
            success: false,
            method,
            error: Some(error.into()),
        }
    }
}

/// Request to submit a prompt to the target page (facade → orchestrator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPrompt {
    pub correlation_id: CorrelationId,
    pub prompt: String,
    /// The page the facade validated against the host allow-list.
    pub target: TargetContext,
}

impl SubmitPrompt {
    pub fn new(correlation_id: CorrelationId, prompt: impl Into<String>, target: TargetContext) -> Self {
        Self {
            correlation_id,
            prompt: prompt.into(),
            target,
        }
    }
}

/// Ack status for a submitted prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Accepted,
    Rejected,
}

/// Acknowledgment returned for a `SubmitPrompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SubmitAck {
    pub fn accepted() -> Self {
        Self {
            status: AckStatus::Accepted,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Rejected,
            reason: Some(reason.into()),
        }
    }
}

/// Failure categories that cross the bus from the page side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Message delivery or script execution failed in the page context.
    CommunicationError,
    /// Both content-setting tiers failed, or no input element existed.
    InjectionFailed,
    /// Injection reported success but the input read back empty.
    VerificationFailed,
    /// The detector hit its tick ceiling without a stable response.
    Timeout,
}

/// A typed failure with a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl PromptFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result payload of a captured response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum CaptureOutcome {
    /// The streamed answer, extracted after it stabilized.
    Text(String),
    /// A typed failure from the page side.
    Failure(PromptFailure),
}

/// Captured-response message (orchestrator → facade, fire-and-forget).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedResponse {
    pub correlation_id: CorrelationId,
    pub outcome: CaptureOutcome,
}

impl CapturedResponse {
    pub fn text(correlation_id: CorrelationId, text: impl Into<String>) -> Self {
        Self {
            correlation_id,
            outcome: CaptureOutcome::Text(text.into()),
        }
    }

    pub fn failure(correlation_id: CorrelationId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            correlation_id,
            outcome: CaptureOutcome::Failure(PromptFailure::new(kind, message)),
        }
    }
}
