use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use promptwire_protocols::{AckStatus, CaptureOutcome, TargetContext};

use crate::bus::message_bus;
use crate::cdp::CdpError;

use super::*;

/// A scripted page covering the whole submission flow.
struct FakePage {
    focus_found: bool,
    marker: Value,
    input_text: String,
    click_succeeds: bool,
    probes: Mutex<Vec<Value>>,
    response_text: String,
    evaluated: Mutex<Vec<String>>,
}

impl FakePage {
    fn happy(probes: Vec<Value>, response_text: &str) -> Self {
        Self {
            focus_found: true,
            marker: json!({"ok": true, "method": "editor-api", "error": null}),
            input_text: "injected prompt".to_string(),
            click_succeeds: true,
            probes: Mutex::new(probes),
            response_text: response_text.to_string(),
            evaluated: Mutex::new(Vec::new()),
        }
    }

    fn saw(&self, needle: &str) -> bool {
        self.evaluated.lock().iter().any(|e| e.contains(needle))
    }
}

#[async_trait]
impl ScriptHost for FakePage {
    async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        self.evaluated.lock().push(expression.to_string());

        if expression.starts_with("delete window[") {
            return Ok(Value::Bool(true));
        }
        if expression.contains("const m = window[") {
            return Ok(self.marker.clone());
        }
        if expression.contains("'use strict'") {
            return Ok(Value::Null);
        }
        if expression.contains("el.focus()") {
            return Ok(Value::Bool(self.focus_found));
        }
        if expression.contains("stopControlPresent") {
            let mut probes = self.probes.lock();
            let value = if probes.len() > 1 {
                probes.remove(0)
            } else {
                probes[0].clone()
            };
            return Ok(value);
        }
        if expression.contains("KeyboardEvent") {
            return Ok(Value::Bool(true));
        }
        if expression.contains("el.click()") {
            return Ok(Value::Bool(self.click_succeeds));
        }
        if expression.contains("TEXTAREA") {
            return Ok(Value::String(self.input_text.clone()));
        }
        Ok(Value::String(self.response_text.clone()))
    }
}

struct FakeAttacher {
    host: std::sync::Arc<FakePage>,
}

#[async_trait]
impl PageAttacher for FakeAttacher {
    async fn attach(&self, _target: &TargetContext) -> Result<std::sync::Arc<dyn ScriptHost>, CdpError> {
        Ok(self.host.clone())
    }
}

fn streaming_then_stable() -> Vec<Value> {
    vec![
        json!({"stopControlPresent": true, "streamingIndicatorPresent": true, "responseLength": 0, "submitEnabled": false}),
        json!({"stopControlPresent": false, "streamingIndicatorPresent": false, "responseLength": 42, "submitEnabled": true}),
        json!({"stopControlPresent": false, "streamingIndicatorPresent": false, "responseLength": 42, "submitEnabled": true}),
        json!({"stopControlPresent": false, "streamingIndicatorPresent": false, "responseLength": 42, "submitEnabled": true}),
    ]
}

fn message() -> SubmitPrompt {
    SubmitPrompt::new(
        Uuid::new_v4(),
        "What is Rust?",
        TargetContext::new("T1", "https://chatgpt.com/"),
    )
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_captures_response() {
    let page = std::sync::Arc::new(FakePage::happy(streaming_then_stable(), "A systems language."));
    let attacher = FakeAttacher { host: page.clone() };
    let config = DriverConfig::default();

    let text = handle_submission(&attacher, &config, &message()).await.unwrap();
    assert_eq!(text, "A systems language.");
    // Submit control was clicked; no Enter fallback needed.
    assert!(page.saw("el.click()"));
    assert!(!page.saw("KeyboardEvent"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_input_aborts_without_submit() {
    let mut page = FakePage::happy(streaming_then_stable(), "ignored");
    page.focus_found = false;
    let page = std::sync::Arc::new(page);
    let attacher = FakeAttacher { host: page.clone() };
    let config = DriverConfig::default();

    let err = handle_submission(&attacher, &config, &message()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InjectionFailed);
    assert!(err.message.contains("not found"));
    // Aborted before any injection or submit attempt.
    assert!(!page.saw("'use strict'"));
    assert!(!page.saw("el.click()"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_reverification_stops_before_submit() {
    let mut page = FakePage::happy(streaming_then_stable(), "ignored");
    page.input_text = "   ".to_string();
    let page = std::sync::Arc::new(page);
    let attacher = FakeAttacher { host: page.clone() };
    let config = DriverConfig::default();

    let err = handle_submission(&attacher, &config, &message()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::VerificationFailed);
    // The false-positive injection result must not lead to a submit.
    assert!(!page.saw("el.click()"));
    assert!(!page.saw("KeyboardEvent"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_injection_surfaces_upstream() {
    let mut page = FakePage::happy(streaming_then_stable(), "ignored");
    page.marker = json!({"ok": false, "method": "dom-manipulation", "error": "input still empty after dom write"});
    page.input_text = String::new();
    let page = std::sync::Arc::new(page);
    let attacher = FakeAttacher { host: page.clone() };
    let config = DriverConfig::default();

    let err = handle_submission(&attacher, &config, &message()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InjectionFailed);
    assert!(err.message.contains("input still empty"));
}

#[tokio::test(start_paused = true)]
async fn test_enter_fallback_when_no_submit_control() {
    let mut page = FakePage::happy(streaming_then_stable(), "answer");
    page.click_succeeds = false;
    let page = std::sync::Arc::new(page);
    let attacher = FakeAttacher { host: page.clone() };
    let config = DriverConfig::default();

    let text = handle_submission(&attacher, &config, &message()).await.unwrap();
    assert_eq!(text, "answer");
    assert!(page.saw("KeyboardEvent"));
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_acks_and_responds_over_the_bus() {
    let (facade, worker) = message_bus(4);
    let page = std::sync::Arc::new(FakePage::happy(streaming_then_stable(), "bus answer"));
    let attacher = std::sync::Arc::new(FakeAttacher { host: page });
    let orchestrator = Orchestrator::new(worker, attacher, std::sync::Arc::new(DriverConfig::default()));

    let mut responses = facade.take_responses().unwrap();
    tokio::spawn(orchestrator.run());

    let msg = message();
    let id = msg.correlation_id;
    let ack = facade.submit(msg).await.unwrap().await.unwrap();
    assert_eq!(ack.status, AckStatus::Accepted);

    let response = responses.recv().await.unwrap();
    assert_eq!(response.correlation_id, id);
    match response.outcome {
        CaptureOutcome::Text(text) => assert_eq!(text, "bus answer"),
        CaptureOutcome::Failure(f) => panic!("unexpected failure: {:?}", f),
    }
}
