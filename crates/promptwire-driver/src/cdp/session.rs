//! Per-page CDP session: script evaluation and the mutation event feed.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use super::client::Dispatch;
use super::error::CdpError;
use super::protocol::CdpEvent;

/// A session attached to a single page target.
pub struct PageSession {
    target_id: String,
    session_id: String,
    dispatch: Arc<Dispatch>,
    /// Raw protocol events for this session; taken once by the detector
    /// as its DOM-change subscription.
    events: Mutex<Option<mpsc::UnboundedReceiver<CdpEvent>>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        dispatch: Arc<Dispatch>,
        event_rx: mpsc::UnboundedReceiver<CdpEvent>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            dispatch,
            events: Mutex::new(Some(event_rx)),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send a CDP command scoped to this session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.dispatch.call(method, params, Some(&self.session_id)).await
    }

    /// Enable the domains this driver observes.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!("enabled cdp domains for session {}", self.session_id);
        Ok(())
    }

    /// Evaluate a JavaScript expression in the page and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("unknown script error");
            return Err(CdpError::Script(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Take the raw event stream, reduced to unit pulses.
    ///
    /// Returns `None` after the first call: the stream is a single-consumer
    /// observation handle, owned by one detector for one submission.
    pub fn take_mutation_pulses(&self) -> Option<mpsc::UnboundedReceiver<()>> {
        let mut raw = self.events.lock().take()?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(event) = raw.recv().await {
                // Only DOM-shaped traffic counts as a mutation signal.
                if event.method.starts_with("DOM.") || event.method.starts_with("Page.") {
                    if tx.send(()).is_err() {
                        break;
                    }
                }
            }
        });
        Some(rx)
    }
}
