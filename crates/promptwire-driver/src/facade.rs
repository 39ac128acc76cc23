//! Caller-facing facade: request lifecycle over the bus.
//!
//! One pending listener per correlation id, registered before the send and
//! removed by whichever outcome wins (captured response, timeout, or
//! cancellation). The remove-then-resolve discipline on the pending map makes
//! resolution exactly-once: a late detector result after a timeout (or vice
//! versa) finds no listener and is a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use promptwire_protocols::{CaptureOutcome, CorrelationId, PromptError, SubmitAck, SubmitPrompt};
use promptwire_protocols::messages::AckStatus;

use crate::bus::{message_bus, FacadeSide};
use crate::cdp::CdpClient;
use crate::config::DriverConfig;
use crate::host::{CdpPageAttacher, PageAttacher};
use crate::locator::{CdpTargetLocator, TargetLocator};
use crate::orchestrator::Orchestrator;

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;

/// Progress stages reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// The submit-prompt message was sent.
    Sending,
    /// The send was acknowledged; awaiting the captured response.
    WaitingForResponse,
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStage::Sending => write!(f, "sending"),
            ProgressStage::WaitingForResponse => write!(f, "waiting for response"),
        }
    }
}

/// Progress callback.
pub type ProgressFn = Arc<dyn Fn(ProgressStage) + Send + Sync>;

/// Per-request options.
#[derive(Clone, Default)]
pub struct SendOptions {
    /// Overall deadline; the config default applies when unset.
    pub timeout: Option<Duration>,
    pub on_progress: Option<ProgressFn>,
    pub cancel: Option<CancellationToken>,
}

impl SendOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_progress(mut self, f: impl Fn(ProgressStage) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

type PendingMap = Arc<Mutex<HashMap<CorrelationId, oneshot::Sender<CaptureOutcome>>>>;

/// The prompt driver facade.
pub struct PromptDriver {
    config: Arc<DriverConfig>,
    locator: Arc<dyn TargetLocator>,
    bus: FacadeSide,
    pending: PendingMap,
    initialized: AtomicBool,
}

impl PromptDriver {
    /// Connect to a running browser and assemble the production stack.
    pub async fn connect(config: DriverConfig) -> Result<Self, PromptError> {
        let client = CdpClient::connect(&config.endpoint)
            .await
            .map_err(|e| PromptError::CommunicationError(e.to_string()))?;
        let locator: Arc<dyn TargetLocator> = Arc::new(CdpTargetLocator::new(config.clone()));
        let attacher: Arc<dyn PageAttacher> = Arc::new(CdpPageAttacher::new(Arc::new(client)));
        Ok(Self::with_parts(config, locator, attacher))
    }

    /// Assemble a facade from explicit parts. The orchestrator task starts
    /// here; the response listener starts on `initialize`.
    pub fn with_parts(
        config: DriverConfig,
        locator: Arc<dyn TargetLocator>,
        attacher: Arc<dyn PageAttacher>,
    ) -> Self {
        let config = Arc::new(config);
        let (facade_side, worker_side) = message_bus(16);
        let orchestrator = Orchestrator::new(worker_side, attacher, config.clone());
        tokio::spawn(orchestrator.run());

        Self {
            config,
            locator,
            bus: facade_side,
            pending: Arc::new(Mutex::new(HashMap::new())),
            initialized: AtomicBool::new(false),
        }
    }

    /// Register the captured-response listener. Idempotent: the response
    /// stream can only be taken once, so N calls still register exactly one
    /// listener task.
    pub fn initialize(&self) {
        if let Some(mut responses) = self.bus.take_responses() {
            let pending = self.pending.clone();
            tokio::spawn(async move {
                while let Some(response) = responses.recv().await {
                    let listener = pending.lock().remove(&response.correlation_id);
                    match listener {
                        Some(tx) => {
                            let _ = tx.send(response.outcome);
                        }
                        None => {
                            // Resolved, timed out, or cancelled already.
                            debug!(
                                correlation_id = %response.correlation_id,
                                "dropping response with no pending listener"
                            );
                        }
                    }
                }
            });
            info!("response listener registered");
        }
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Whether a target page currently exists. Re-scans every call and
    /// touches no request state.
    pub async fn is_available(&self) -> bool {
        matches!(self.locator.resolve().await, Ok(Some(_)))
    }

    /// Submit a prompt and await the captured response.
    pub async fn send_prompt(&self, text: &str, options: SendOptions) -> Result<String, PromptError> {
        if !self.is_initialized() {
            return Err(PromptError::NotInitialized);
        }
        if text.trim().is_empty() {
            return Err(PromptError::InvalidInput("prompt is empty".to_string()));
        }

        // Re-resolved per request: the tab may have closed or navigated.
        let target = self
            .locator
            .resolve()
            .await
            .map_err(|e| PromptError::CommunicationError(e.to_string()))?
            .ok_or(PromptError::TargetNotFound)?;

        let correlation_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(correlation_id, tx);

        let message = SubmitPrompt::new(correlation_id, text, target);
        let ack_rx = match self.bus.submit(message).await {
            Ok(receiver) => receiver,
            Err(e) => {
                self.pending.lock().remove(&correlation_id);
                return Err(PromptError::CommunicationError(e.to_string()));
            }
        };
        self.report(&options, ProgressStage::Sending);

        match ack_rx.await {
            Ok(SubmitAck {
                status: AckStatus::Accepted,
                ..
            }) => {}
            Ok(ack) => {
                self.pending.lock().remove(&correlation_id);
                return Err(PromptError::CommunicationError(
                    ack.reason.unwrap_or_else(|| "submission rejected".to_string()),
                ));
            }
            Err(_) => {
                self.pending.lock().remove(&correlation_id);
                return Err(PromptError::CommunicationError(
                    "submission was never acknowledged".to_string(),
                ));
            }
        }
        self.report(&options, ProgressStage::WaitingForResponse);

        let timeout = options
            .timeout
            .unwrap_or_else(|| Duration::from_secs(self.config.default_timeout_secs));
        let cancel = options.cancel.clone().unwrap_or_default();

        tokio::select! {
            outcome = rx => match outcome {
                Ok(CaptureOutcome::Text(text)) => Ok(text),
                Ok(CaptureOutcome::Failure(failure)) => Err(failure.into()),
                Err(_) => Err(PromptError::CommunicationError(
                    "response channel dropped".to_string(),
                )),
            },
            _ = tokio::time::sleep(timeout) => {
                self.pending.lock().remove(&correlation_id);
                warn!(%correlation_id, "request timed out after {:?}", timeout);
                Err(PromptError::Timeout(format!(
                    "no captured response within {} s",
                    timeout.as_secs()
                )))
            }
            _ = cancel.cancelled() => {
                self.pending.lock().remove(&correlation_id);
                debug!(%correlation_id, "request cancelled by caller");
                Err(PromptError::Cancelled)
            }
        }
    }

    fn report(&self, options: &SendOptions, stage: ProgressStage) {
        if let Some(callback) = &options.on_progress {
            callback(stage);
        }
    }
}
