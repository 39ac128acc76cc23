//! Privileged broker: runs the injection routine in the page and retrieves
//! its result through a scoped marker.

use serde::Deserialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use promptwire_protocols::{
    CorrelationId, FailureKind, InjectionMethod, InjectionResult, PromptFailure,
};

use crate::config::SiteProfile;
use crate::host::ScriptHost;
use crate::inject;

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;

/// Settle delay before reading the marker, so the routine's own staggered
/// verification timers (300 ms + 200 ms) have finished.
const MARKER_SETTLE: Duration = Duration::from_millis(500);

/// What the injection routine wrote to the marker.
#[derive(Debug, Deserialize)]
struct MarkerRecord {
    ok: bool,
    method: InjectionMethod,
    error: Option<String>,
}

/// The only component that executes script inside the target page.
///
/// Callers always receive a structured outcome: tier failures come back as
/// an unsuccessful [`InjectionResult`], and execution failures (page
/// navigated away, session closed) come back as a communication failure,
/// never an uncaught error.
pub struct PageBroker<'a> {
    host: &'a dyn ScriptHost,
    profile: &'a SiteProfile,
}

impl<'a> PageBroker<'a> {
    pub fn new(host: &'a dyn ScriptHost, profile: &'a SiteProfile) -> Self {
        Self { host, profile }
    }

    /// Run the injection routine and collect its result.
    ///
    /// The result marker is scoped to this attempt (keyed by correlation
    /// id), read once, and deleted whenever present so it cannot leak into
    /// a later attempt. An absent or failed marker triggers the secondary
    /// probe: re-reading the input's visible text directly.
    pub async fn inject_and_retrieve(
        &self,
        correlation_id: CorrelationId,
        text: &str,
    ) -> Result<InjectionResult, PromptFailure> {
        let marker = format!("__promptwireResult_{}", correlation_id.simple());

        let expression = inject::injection_expression(&marker, text, self.profile);
        self.host.evaluate(&expression).await.map_err(|e| {
            PromptFailure::new(
                FailureKind::CommunicationError,
                format!("injection routine failed to execute: {}", e),
            )
        })?;

        sleep(MARKER_SETTLE).await;

        let raw = self
            .host
            .evaluate(&inject::read_marker_expression(&marker))
            .await
            .map_err(|e| {
                PromptFailure::new(
                    FailureKind::CommunicationError,
                    format!("failed to read injection result: {}", e),
                )
            })?;

        let record: Option<MarkerRecord> = if raw.is_null() {
            None
        } else {
            match serde_json::from_value(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("malformed injection result marker: {}", e);
                    None
                }
            }
        };

        if record.is_some() {
            // Single-read contract: the marker never survives a collection.
            if let Err(e) = self
                .host
                .evaluate(&inject::delete_marker_expression(&marker))
                .await
            {
                warn!("failed to delete injection result marker: {}", e);
            }
        }

        match record {
            Some(record) if record.ok => {
                debug!(method = %record.method, "injection reported success");
                Ok(InjectionResult::succeeded(record.method))
            }
            record => {
                let original_error = record
                    .and_then(|r| r.error)
                    .unwrap_or_else(|| "no result marker after injection".to_string());
                self.probe_input_text(original_error).await
            }
        }
    }

    /// Secondary verification: read the input's visible text directly. A
    /// non-empty read means the content landed even though the marker was
    /// inconclusive.
    async fn probe_input_text(&self, original_error: String) -> Result<InjectionResult, PromptFailure> {
        let text = self
            .host
            .evaluate(&inject::input_text_expression(self.profile))
            .await
            .map_err(|e| {
                PromptFailure::new(
                    FailureKind::CommunicationError,
                    format!("secondary verification probe failed: {}", e),
                )
            })?;

        let visible = text.as_str().map(str::trim).unwrap_or("");
        if !visible.is_empty() {
            debug!("secondary probe found content; synthesizing dom-manipulation success");
            Ok(InjectionResult::succeeded(InjectionMethod::DomManipulation))
        } else {
            Ok(InjectionResult::failed(
                InjectionMethod::DomManipulation,
                original_error,
            ))
        }
    }
}
