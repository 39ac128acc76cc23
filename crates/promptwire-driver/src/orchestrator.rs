//! Content orchestrator: drives one prompt through the page.
//!
//! Consumes submit-prompt messages from the bus, attaches to the located
//! page, injects via the broker, independently re-verifies the input,
//! submits, and hands off to the completion detector. Every outcome,
//! captured text or typed failure, goes back over the bus as a
//! fire-and-forget captured-response message.

use std::sync::Arc;

use serde_json::Value;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use promptwire_protocols::{CapturedResponse, FailureKind, PromptFailure, SubmitAck, SubmitPrompt};

use crate::broker::PageBroker;
use crate::bus::WorkerSide;
use crate::config::{DriverConfig, SiteProfile};
use crate::detector::CompletionDetector;
use crate::host::{PageAttacher, ScriptHost};
use crate::inject;

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

/// Settle delay between a verified injection and the submit action, so the
/// host UI's own update cycle catches up.
const SUBMIT_SETTLE: Duration = Duration::from_millis(300);

/// The page-side worker.
pub struct Orchestrator {
    bus: WorkerSide,
    attacher: Arc<dyn PageAttacher>,
    config: Arc<DriverConfig>,
}

impl Orchestrator {
    pub fn new(bus: WorkerSide, attacher: Arc<dyn PageAttacher>, config: Arc<DriverConfig>) -> Self {
        Self {
            bus,
            attacher,
            config,
        }
    }

    /// Consume submissions until the facade side closes. Each submission is
    /// acked on receipt and handled on its own task, so a slow detector on
    /// one request never blocks another.
    pub async fn run(mut self) {
        while let Some(submission) = self.bus.next_submission().await {
            let message = submission.message;
            let _ = submission.ack.send(SubmitAck::accepted());

            let attacher = self.attacher.clone();
            let config = self.config.clone();
            let responses = self.bus.response_sender();
            tokio::spawn(async move {
                let correlation_id = message.correlation_id;
                let response = match handle_submission(attacher.as_ref(), &config, &message).await {
                    Ok(text) => {
                        info!(%correlation_id, chars = text.len(), "response captured");
                        CapturedResponse::text(correlation_id, text)
                    }
                    Err(failure) => {
                        warn!(%correlation_id, kind = ?failure.kind, "{}", failure.message);
                        CapturedResponse {
                            correlation_id,
                            outcome: promptwire_protocols::CaptureOutcome::Failure(failure),
                        }
                    }
                };
                let _ = responses.send(response);
            });
        }
        debug!("orchestrator shutting down; facade side closed");
    }
}

/// Drive one submission end to end.
async fn handle_submission(
    attacher: &dyn PageAttacher,
    config: &DriverConfig,
    message: &SubmitPrompt,
) -> Result<String, PromptFailure> {
    let profile = config.profile_for_url(&message.target.url).ok_or_else(|| {
        PromptFailure::new(
            FailureKind::CommunicationError,
            format!("no site profile serves {}", message.target.url),
        )
    })?;

    let host = attacher.attach(&message.target).await.map_err(|e| {
        PromptFailure::new(
            FailureKind::CommunicationError,
            format!("failed to attach to the target page: {}", e),
        )
    })?;

    // Locate and focus the input. No retry: a missing input means the page
    // structure is wrong or not loaded.
    let focused = host
        .evaluate(&inject::focus_input_expression(profile))
        .await
        .map_err(comm("failed to locate the prompt input"))?;
    if focused != Value::Bool(true) {
        return Err(PromptFailure::new(
            FailureKind::InjectionFailed,
            "prompt input element not found",
        ));
    }

    let broker = PageBroker::new(host.as_ref(), profile);
    let result = broker
        .inject_and_retrieve(message.correlation_id, &message.prompt)
        .await?;
    if !result.success {
        return Err(PromptFailure::new(
            FailureKind::InjectionFailed,
            result
                .error
                .unwrap_or_else(|| "both injection tiers failed".to_string()),
        ));
    }

    // Defense against a false-positive injection result: re-read the input
    // independently before committing to a submit.
    let visible = host
        .evaluate(&inject::input_text_expression(profile))
        .await
        .map_err(comm("failed to re-verify the prompt input"))?;
    if visible.as_str().map(str::trim).unwrap_or("").is_empty() {
        return Err(PromptFailure::new(
            FailureKind::VerificationFailed,
            "input read back empty after a successful injection result",
        ));
    }

    debug!(method = %result.method, "prompt injected and verified");
    sleep(SUBMIT_SETTLE).await;

    submit(host.as_ref(), profile).await?;

    let detector = CompletionDetector::new(host.as_ref(), profile);
    detector.wait_for_response().await
}

/// Activate a submit control, or fall back to a synthetic Enter key-press
/// on the input.
async fn submit(host: &dyn ScriptHost, profile: &SiteProfile) -> Result<(), PromptFailure> {
    for selector in &profile.submit_selectors {
        let clicked = host
            .evaluate(&click_expression(selector))
            .await
            .map_err(comm("failed to activate the submit control"))?;
        if clicked == Value::Bool(true) {
            debug!(selector = selector.as_str(), "submit control activated");
            return Ok(());
        }
    }

    debug!("no usable submit control; synthesizing Enter");
    host.evaluate(&enter_keypress_expression(profile))
        .await
        .map_err(comm("failed to synthesize the Enter key-press"))?;
    Ok(())
}

fn comm(context: &'static str) -> impl Fn(crate::cdp::CdpError) -> PromptFailure {
    move |e| PromptFailure::new(FailureKind::CommunicationError, format!("{}: {}", context, e))
}

/// Click a selector if present and enabled; reports whether it fired.
fn click_expression(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el || el.disabled) return false;
            el.click();
            return true;
        }})()"#,
        sel = inject::js_string(selector)
    )
}

/// Raise a synthetic Enter on the input (or whatever holds focus).
fn enter_keypress_expression(profile: &SiteProfile) -> String {
    format!(
        r#"(() => {{
            let el = null;
            for (const sel of {selectors}) {{
                el = document.querySelector(sel);
                if (el) break;
            }}
            const target = el || document.activeElement;
            if (!target) return false;
            const init = {{ key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true, cancelable: true }};
            target.dispatchEvent(new KeyboardEvent('keydown', init));
            target.dispatchEvent(new KeyboardEvent('keyup', init));
            return true;
        }})()"#,
        selectors = inject::js_string_array(&profile.input_selectors)
    )
}
