//! Caller-facing error taxonomy.

use thiserror::Error;

use crate::messages::{FailureKind, PromptFailure};

/// Errors surfaced to callers of the prompt facade.
///
/// Failures internal to the two-tier injection strategy never appear here
/// directly: Tier 1 falls through to Tier 2 silently, and only a Tier 2
/// failure surfaces as `InjectionFailed`. Everything past that boundary
/// propagates unchanged.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("facade not initialized; call initialize() first")]
    NotInitialized,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no open page matches the configured chat hosts")]
    TargetNotFound,

    #[error("communication error: {0}")]
    CommunicationError(String),

    #[error("injection failed: {0}")]
    InjectionFailed(String),

    #[error("injection reported success but the input read back empty: {0}")]
    VerificationFailed(String),

    #[error("timed out waiting for a stable response: {0}")]
    Timeout(String),

    #[error("request cancelled")]
    Cancelled,
}

impl From<PromptFailure> for PromptError {
    fn from(failure: PromptFailure) -> Self {
        match failure.kind {
            FailureKind::CommunicationError => PromptError::CommunicationError(failure.message),
            FailureKind::InjectionFailed => PromptError::InjectionFailed(failure.message),
            FailureKind::VerificationFailed => PromptError::VerificationFailed(failure.message),
            FailureKind::Timeout => PromptError::Timeout(failure.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        let err = PromptError::from(PromptFailure::new(FailureKind::InjectionFailed, "both tiers failed"));
        assert!(matches!(err, PromptError::InjectionFailed(_)));
        assert!(err.to_string().contains("both tiers failed"));

        let err = PromptError::from(PromptFailure::new(FailureKind::Timeout, "tick ceiling"));
        assert!(matches!(err, PromptError::Timeout(_)));

        let err = PromptError::from(PromptFailure::new(FailureKind::CommunicationError, "page gone"));
        assert!(matches!(err, PromptError::CommunicationError(_)));

        let err = PromptError::from(PromptFailure::new(FailureKind::VerificationFailed, "empty"));
        assert!(matches!(err, PromptError::VerificationFailed(_)));
    }

    #[test]
    fn test_display_messages() {
        assert!(PromptError::NotInitialized.to_string().contains("initialize()"));
        assert!(PromptError::TargetNotFound.to_string().contains("no open page"));
        assert!(PromptError::InvalidInput("empty prompt".into())
            .to_string()
            .contains("empty prompt"));
        assert_eq!(PromptError::Cancelled.to_string(), "request cancelled");
    }
}
