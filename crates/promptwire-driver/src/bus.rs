//! Message-bus adapter between the facade and the orchestrator.
//!
//! Wraps the async channel primitives into a uniform send/receive contract:
//! submissions travel facade → orchestrator with a per-message ack, and
//! captured responses travel back fire-and-forget. Delivery is FIFO per
//! channel; correlation ids carry the request/response pairing.

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use promptwire_protocols::{CapturedResponse, SubmitAck, SubmitPrompt};

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;

/// The far side of the bus went away.
#[derive(Debug, Error)]
#[error("message bus closed")]
pub struct BusClosed;

/// A submission in flight, with its ack return path.
pub struct PromptSubmission {
    pub message: SubmitPrompt,
    pub ack: oneshot::Sender<SubmitAck>,
}

/// Facade-side endpoint.
pub struct FacadeSide {
    submits: mpsc::Sender<PromptSubmission>,
    responses: Mutex<Option<mpsc::UnboundedReceiver<CapturedResponse>>>,
}

impl FacadeSide {
    /// Send a submit-prompt message; the returned receiver yields the ack.
    pub async fn submit(&self, message: SubmitPrompt) -> Result<oneshot::Receiver<SubmitAck>, BusClosed> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.submits
            .send(PromptSubmission {
                message,
                ack: ack_tx,
            })
            .await
            .map_err(|_| BusClosed)?;
        Ok(ack_rx)
    }

    /// Take the captured-response stream. Single-consumer: `Some` exactly
    /// once, so repeated facade initialization cannot register a second
    /// listener.
    pub fn take_responses(&self) -> Option<mpsc::UnboundedReceiver<CapturedResponse>> {
        self.responses.lock().take()
    }
}

/// Orchestrator-side endpoint.
pub struct WorkerSide {
    submits: mpsc::Receiver<PromptSubmission>,
    responses: mpsc::UnboundedSender<CapturedResponse>,
}

impl WorkerSide {
    /// Next submission, or `None` when the facade side is gone.
    pub async fn next_submission(&mut self) -> Option<PromptSubmission> {
        self.submits.recv().await
    }

    /// A clonable sender for captured responses.
    pub fn response_sender(&self) -> mpsc::UnboundedSender<CapturedResponse> {
        self.responses.clone()
    }
}

/// Build a connected bus pair.
pub fn message_bus(capacity: usize) -> (FacadeSide, WorkerSide) {
    let (submit_tx, submit_rx) = mpsc::channel(capacity);
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    (
        FacadeSide {
            submits: submit_tx,
            responses: Mutex::new(Some(response_rx)),
        },
        WorkerSide {
            submits: submit_rx,
            responses: response_tx,
        },
    )
}
