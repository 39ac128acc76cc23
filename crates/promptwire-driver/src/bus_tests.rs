use uuid::Uuid;

use promptwire_protocols::{AckStatus, TargetContext};

use super::*;

fn submit_message() -> SubmitPrompt {
    SubmitPrompt::new(
        Uuid::new_v4(),
        "hello",
        TargetContext::new("T1", "https://chatgpt.com/"),
    )
}

#[tokio::test]
async fn test_submit_ack_roundtrip() {
    let (facade, mut worker) = message_bus(4);

    let ack_rx = facade.submit(submit_message()).await.unwrap();
    let submission = worker.next_submission().await.unwrap();
    assert_eq!(submission.message.prompt, "hello");
    submission.ack.send(SubmitAck::accepted()).unwrap();

    let ack = ack_rx.await.unwrap();
    assert_eq!(ack.status, AckStatus::Accepted);
}

#[tokio::test]
async fn test_responses_taken_exactly_once() {
    let (facade, _worker) = message_bus(4);
    assert!(facade.take_responses().is_some());
    assert!(facade.take_responses().is_none());
    assert!(facade.take_responses().is_none());
}

#[tokio::test]
async fn test_fifo_per_channel() {
    let (facade, mut worker) = message_bus(4);

    let first = submit_message();
    let second = submit_message();
    let first_id = first.correlation_id;
    let second_id = second.correlation_id;

    facade.submit(first).await.unwrap();
    facade.submit(second).await.unwrap();

    assert_eq!(worker.next_submission().await.unwrap().message.correlation_id, first_id);
    assert_eq!(worker.next_submission().await.unwrap().message.correlation_id, second_id);
}

#[tokio::test]
async fn test_submit_after_worker_drop_fails() {
    let (facade, worker) = message_bus(4);
    drop(worker);
    assert!(facade.submit(submit_message()).await.is_err());
}
