//! Completion detection for a streamed answer.
//!
//! DOM quiescence alone is not a completion signal for a continuously
//! mutating streaming UI, where a pause may be transient. The detector instead
//! requires confirmed streaming (a stop control was seen at least once),
//! then the absence of every streaming signal, then a debounce window of
//! unchanged response length before declaring the answer finished.
//!
//! Observation is dual-triggered: a DOM-change subscription and a fixed
//! one-second poll both funnel into a single idempotent `observe` step, so
//! the order and interleaving of the two schedulers cannot double-fire a
//! transition.

use serde::Deserialize;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use promptwire_protocols::{FailureKind, PromptFailure};

use crate::config::SiteProfile;
use crate::host::ScriptHost;
use crate::inject::{js_string, js_string_array};

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;

/// Poll cadence driving ticks when the page goes quiet.
const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Consecutive ticks of unchanged response length required for `Stable`.
const STABILITY_WINDOW: u32 = 3;
/// Hard ceiling: ticks before giving up (~5 minutes at poll cadence).
const MAX_TICKS: u32 = 300;

/// Sentinel failure text emitted when the tick ceiling is reached.
pub const TIMEOUT_SENTINEL: &str = "response did not stabilize before the tick ceiling";

/// DOM signals sampled on one tick.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSignals {
    /// A "stop/cancel generation" control is present.
    pub stop_control_present: bool,
    /// The output area carries a streaming visual-state indicator.
    pub streaming_indicator_present: bool,
    /// Text length of the latest response block; 0 when none exists.
    pub response_length: u64,
    /// Whether the submit control is enabled; `None` when not locatable.
    pub submit_enabled: Option<bool>,
}

/// Terminal verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorOutcome {
    /// The response stabilized; extract and emit it.
    Stable,
    /// Tick ceiling reached without stability.
    TimedOut,
}

/// The completion state machine: `Idle → Streaming → Candidate → Stable`,
/// with `TimedOut` as the failure terminal.
///
/// Owned by one submission; `observe` is idempotent once a terminal state
/// is reached, so both tick sources may call it freely.
#[derive(Debug)]
pub struct DetectorState {
    tick_count: u32,
    streaming_detected: bool,
    last_observed_length: u64,
    stable_ticks: u32,
    terminal: Option<DetectorOutcome>,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorState {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            streaming_detected: false,
            last_observed_length: 0,
            stable_ticks: 0,
            terminal: None,
        }
    }

    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    pub fn streaming_detected(&self) -> bool {
        self.streaming_detected
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Evaluate one tick's signals. Returns the terminal outcome on the
    /// tick that reaches it, `None` otherwise (including every tick after
    /// a terminal state).
    pub fn observe(&mut self, signals: TickSignals) -> Option<DetectorOutcome> {
        if self.terminal.is_some() {
            return None;
        }
        self.tick_count += 1;

        // Latched once streaming is seen; never reset.
        if signals.stop_control_present {
            self.streaming_detected = true;
        }

        let candidate = self.streaming_detected
            && !signals.stop_control_present
            && !signals.streaming_indicator_present
            && signals.response_length > 0
            && signals.submit_enabled.unwrap_or(true);

        if candidate {
            if signals.response_length == self.last_observed_length {
                self.stable_ticks += 1;
            } else {
                // New baseline; this tick is its first stable observation.
                self.last_observed_length = signals.response_length;
                self.stable_ticks = 1;
            }
            trace!(
                tick = self.tick_count,
                length = signals.response_length,
                stable = self.stable_ticks,
                "completion candidate"
            );
            if self.stable_ticks >= STABILITY_WINDOW {
                self.terminal = Some(DetectorOutcome::Stable);
                return Some(DetectorOutcome::Stable);
            }
        } else {
            self.stable_ticks = 0;
        }

        if self.tick_count >= MAX_TICKS {
            self.terminal = Some(DetectorOutcome::TimedOut);
            return Some(DetectorOutcome::TimedOut);
        }

        None
    }
}

/// Drives a [`DetectorState`] against a live page until terminal.
pub struct CompletionDetector<'a> {
    host: &'a dyn ScriptHost,
    profile: &'a SiteProfile,
}

impl<'a> CompletionDetector<'a> {
    pub fn new(host: &'a dyn ScriptHost, profile: &'a SiteProfile) -> Self {
        Self { host, profile }
    }

    /// Observe until the machine reaches a terminal state; on `Stable`,
    /// extract and return the response text.
    ///
    /// Both observation handles (the mutation subscription and the poll)
    /// are released when this returns.
    pub async fn wait_for_response(&self) -> Result<String, PromptFailure> {
        let mut state = DetectorState::new();
        let mut pulses = self.host.take_mutation_pulses();
        let mut poll = interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll.tick() => {}
                pulse = recv_pulse(&mut pulses) => {
                    if pulse.is_none() {
                        // Subscription ended; the poll alone drives ticks.
                        pulses = None;
                        continue;
                    }
                    // Coalesce bursts into one tick.
                    if let Some(rx) = pulses.as_mut() {
                        while rx.try_recv().is_ok() {}
                    }
                }
            }

            let signals = self.probe().await?;
            match state.observe(signals) {
                Some(DetectorOutcome::Stable) => {
                    debug!(ticks = state.tick_count(), "response stabilized");
                    return self.extract().await;
                }
                Some(DetectorOutcome::TimedOut) => {
                    warn!(ticks = state.tick_count(), "detector hit the tick ceiling");
                    return Err(PromptFailure::new(FailureKind::Timeout, TIMEOUT_SENTINEL));
                }
                None => {}
            }
        }
    }

    /// Sample the page for this tick's signals.
    async fn probe(&self) -> Result<TickSignals, PromptFailure> {
        let value = self
            .host
            .evaluate(&probe_expression(self.profile))
            .await
            .map_err(|e| {
                PromptFailure::new(
                    FailureKind::CommunicationError,
                    format!("completion probe failed: {}", e),
                )
            })?;
        serde_json::from_value(value).map_err(|e| {
            PromptFailure::new(
                FailureKind::CommunicationError,
                format!("completion probe returned malformed signals: {}", e),
            )
        })
    }

    /// Extract the latest response block's text.
    async fn extract(&self) -> Result<String, PromptFailure> {
        let value = self
            .host
            .evaluate(&extract_expression(self.profile))
            .await
            .map_err(|e| {
                PromptFailure::new(
                    FailureKind::CommunicationError,
                    format!("response extraction failed: {}", e),
                )
            })?;
        match value.as_str() {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(PromptFailure::new(
                FailureKind::CommunicationError,
                "response block disappeared before extraction",
            )),
        }
    }
}

async fn recv_pulse(pulses: &mut Option<tokio::sync::mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match pulses {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Expression sampling all four signals in one evaluation.
fn probe_expression(profile: &SiteProfile) -> String {
    format!(
        r#"(() => {{
            const first = (sels) => {{
                for (const sel of sels) {{
                    const el = document.querySelector(sel);
                    if (el) return el;
                }}
                return null;
            }};
            const stop = first({stop});
            const streaming = document.querySelector({indicator});
            let length = 0;
            for (const sel of {responses}) {{
                const list = document.querySelectorAll(sel);
                if (list.length) {{
                    const last = list[list.length - 1];
                    length = (last.innerText || last.textContent || '').trim().length;
                    break;
                }}
            }}
            const submit = first({submit});
            return {{
                stopControlPresent: !!stop,
                streamingIndicatorPresent: !!streaming,
                responseLength: length,
                submitEnabled: submit ? !submit.disabled : null
            }};
        }})()"#,
        stop = js_string_array(&profile.stop_selectors),
        indicator = js_string(&profile.streaming_indicator),
        responses = js_string_array(&profile.response_selectors),
        submit = js_string_array(&profile.submit_selectors),
    )
}

/// Expression extracting the latest response block's text.
fn extract_expression(profile: &SiteProfile) -> String {
    format!(
        r#"(() => {{
            for (const sel of {responses}) {{
                const list = document.querySelectorAll(sel);
                if (list.length) {{
                    const last = list[list.length - 1];
                    return (last.innerText || last.textContent || '').trim();
                }}
            }}
            return '';
        }})()"#,
        responses = js_string_array(&profile.response_selectors),
    )
}
