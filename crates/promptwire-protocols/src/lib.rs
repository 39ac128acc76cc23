//! Protocol definitions for Promptwire.
//!
//! Everything that crosses a context boundary lives here: the messages
//! exchanged over the bus between the caller-facing facade and the page-side
//! orchestrator, the correlation identifier that ties a response back to the
//! caller that asked for it, and the error taxonomy surfaced to callers.
//!
//! ## Core Concepts
//!
//! - **CorrelationId**: a unique token tagging one logical request so its
//!   eventual response resolves exactly one waiting listener.
//! - **SubmitPrompt / SubmitAck**: the request leg: prompt text plus the
//!   page target it was validated against, acknowledged on receipt.
//! - **CapturedResponse**: the response leg: fire-and-forget, carrying
//!   either the captured text or a typed failure.

pub mod error;
pub mod messages;

pub use error::PromptError;
pub use messages::{
    AckStatus, CaptureOutcome, CapturedResponse, CorrelationId, FailureKind, InjectionMethod,
    InjectionResult, PromptFailure, SubmitAck, SubmitPrompt, TargetContext,
};
