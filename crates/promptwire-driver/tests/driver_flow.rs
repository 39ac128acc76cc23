//! End-to-end flow through the public API: facade → bus → orchestrator →
//! broker → detector against a scripted page, no browser involved.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use promptwire_driver::{
    DriverConfig, PageAttacher, ProgressStage, PromptDriver, ScriptHost, SendOptions, TargetLocator,
};
use promptwire_protocols::{PromptError, TargetContext};

/// Simulated chat page: accepts the injection, then streams an answer whose
/// length grows across the first polls before settling.
struct StreamingPage {
    prompt: Mutex<Option<String>>,
    tick: Mutex<u32>,
}

impl StreamingPage {
    fn new() -> Self {
        Self {
            prompt: Mutex::new(None),
            tick: Mutex::new(0),
        }
    }

    fn answer(&self) -> String {
        format!(
            "Answer to: {}",
            self.prompt.lock().clone().unwrap_or_default()
        )
    }
}

#[async_trait]
impl ScriptHost for StreamingPage {
    async fn evaluate(&self, expression: &str) -> Result<Value, promptwire_driver::CdpError> {
        if expression.starts_with("delete window[") {
            return Ok(Value::Bool(true));
        }
        if expression.contains("const m = window[") {
            // Tier 1 unavailable on this page: the routine fell back to
            // raw DOM writes and reported that method.
            return Ok(json!({"ok": true, "method": "dom-manipulation", "error": null}));
        }
        if expression.contains("'use strict'") {
            if let Some((_, args)) = expression.rsplit_once('(') {
                let args = args.trim_end_matches([';', ')']);
                if let Ok(opts) = serde_json::from_str::<Value>(args) {
                    if let Some(text) = opts["text"].as_str() {
                        *self.prompt.lock() = Some(text.to_string());
                    }
                }
            }
            return Ok(Value::Null);
        }
        if expression.contains("el.focus()") {
            return Ok(Value::Bool(true));
        }
        if expression.contains("stopControlPresent") {
            let mut tick = self.tick.lock();
            *tick += 1;
            // Streaming for 3 ticks with growing content, then quiet.
            let (streaming, length) = match *tick {
                1 => (true, 0),
                2 => (true, 12),
                3 => (true, 30),
                _ => (false, self.answer().len() as u64),
            };
            return Ok(json!({
                "stopControlPresent": streaming,
                "streamingIndicatorPresent": streaming,
                "responseLength": length,
                "submitEnabled": !streaming,
            }));
        }
        if expression.contains("KeyboardEvent") || expression.contains("el.click()") {
            return Ok(Value::Bool(true));
        }
        if expression.contains("TEXTAREA") {
            return Ok(Value::String(
                self.prompt.lock().clone().unwrap_or_default(),
            ));
        }
        Ok(Value::String(self.answer()))
    }
}

struct StreamingAttacher;

#[async_trait]
impl PageAttacher for StreamingAttacher {
    async fn attach(
        &self,
        _target: &TargetContext,
    ) -> Result<Arc<dyn ScriptHost>, promptwire_driver::CdpError> {
        Ok(Arc::new(StreamingPage::new()))
    }
}

struct FixedLocator(Option<TargetContext>);

#[async_trait]
impl TargetLocator for FixedLocator {
    async fn resolve(&self) -> Result<Option<TargetContext>, promptwire_driver::CdpError> {
        Ok(self.0.clone())
    }
}

fn target() -> TargetContext {
    TargetContext::new("TAB-1", "https://claude.ai/new")
}

#[tokio::test(start_paused = true)]
async fn test_full_flow_resolves_with_streamed_answer() {
    let driver = PromptDriver::with_parts(
        DriverConfig::default(),
        Arc::new(FixedLocator(Some(target()))),
        Arc::new(StreamingAttacher),
    );
    driver.initialize();
    assert!(driver.is_available().await);

    let stages: Arc<Mutex<Vec<ProgressStage>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = stages.clone();
    let options = SendOptions::default().with_progress(move |s| recorded.lock().push(s));

    let answer = driver.send_prompt("Explain ownership", options).await.unwrap();
    assert_eq!(answer, "Answer to: Explain ownership");
    assert_eq!(
        *stages.lock(),
        vec![ProgressStage::Sending, ProgressStage::WaitingForResponse]
    );
}

#[tokio::test(start_paused = true)]
async fn test_success_and_timeout_are_mutually_exclusive() {
    let driver = PromptDriver::with_parts(
        DriverConfig::default(),
        Arc::new(FixedLocator(Some(target()))),
        Arc::new(StreamingAttacher),
    );
    driver.initialize();

    // Generous deadline: the flow resolves with text, and only text.
    let result = driver
        .send_prompt(
            "short question",
            SendOptions::default().with_timeout(std::time::Duration::from_secs(120)),
        )
        .await;
    match result {
        Ok(text) => assert!(!text.is_empty()),
        Err(e) => panic!("expected captured text, got {e}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_closed_tab_between_requests() {
    let driver = PromptDriver::with_parts(
        DriverConfig::default(),
        Arc::new(FixedLocator(None)),
        Arc::new(StreamingAttacher),
    );
    driver.initialize();
    assert!(!driver.is_available().await);
    let err = driver
        .send_prompt("anyone there?", SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PromptError::TargetNotFound));
}
