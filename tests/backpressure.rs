//! Outbound writes pause while the data channel is saturated.

use std::time::Duration;

use peerframe::{
    ReadyState,
    SendError,
    TransportConfig,
    channel::{ChannelError, DataChannel, FrameWriter},
};
use peerframe_testing::{FakeDataChannel, text_frames};
use rstest::rstest;
use tokio_util::sync::CancellationToken;

mod common;
use common::{SMALL_FRAME, config, open};

const LONG: &str = r#"{"type":"start","id":"9","payload":{"query":"mutation { sendGCodes(input: {machineID: \"printer-1\", gcodes: [\"G28\", \"G1 X10 Y10\", \"M104 S200\"]}) { id } }"}}"#;

#[rstest]
#[tokio::test(start_paused = true)]
async fn writer_waits_for_the_channel_to_drain(config: TransportConfig) {
    let harness = open(config.clone()).await;
    let channel = harness.peer.channel();
    let expected = text_frames(LONG, &config);
    assert!(expected.len() > 2);
    channel.hold();

    harness.socket.send(LONG).expect("send");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let held = channel.sent();
    assert_eq!(held.len(), 1, "a full frame reaches the threshold");
    assert_eq!(held[0].len(), SMALL_FRAME);
    assert_eq!(channel.buffered_amount(), SMALL_FRAME);

    channel.drain();
    let sent = channel.wait_for_sent(expected.len()).await;
    assert_eq!(sent.len(), expected.len());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn a_full_queue_refuses_further_sends(config: TransportConfig) {
    let harness = open(config.clone().with_max_queued_messages(1)).await;
    let channel = harness.peer.channel();
    channel.hold();

    harness.socket.send(LONG).expect("first message reaches the writer");
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.socket.send(LONG).expect("second message waits in the queue");

    assert!(matches!(harness.socket.send(LONG), Err(SendError::QueueFull)));
    assert_eq!(harness.socket.ready_state(), ReadyState::Open);

    channel.drain();
    let per_message = text_frames(LONG, &config).len();
    let sent = channel.wait_for_sent(per_message * 2).await;
    assert_eq!(sent.len(), per_message * 2);
}

#[tokio::test]
async fn cancelled_writes_do_not_reach_the_channel() {
    let channel = std::sync::Arc::new(FakeDataChannel::new(4));
    channel.hold();
    let writer = FrameWriter::new(channel.clone(), 4);
    let shutdown = CancellationToken::new();

    writer
        .write(bytes::Bytes::from_static(b"12345"), &shutdown)
        .await
        .expect("first write fits");
    shutdown.cancel();

    assert_eq!(
        writer
            .write(bytes::Bytes::from_static(b"678"), &shutdown)
            .await,
        Err(ChannelError::Cancelled)
    );
    assert_eq!(channel.sent().len(), 1);
}

#[rstest]
#[tokio::test]
async fn channel_failure_closes_the_socket(config: TransportConfig) {
    let mut harness = open(config).await;
    harness
        .peer
        .channel()
        .fail_with(ChannelError::Send("SCTP association aborted".into()));

    harness.socket.send(LONG).expect("queued");

    assert_eq!(
        harness.events.expect_error().await,
        (
            4000,
            "data channel send failed: SCTP association aborted".into()
        )
    );
    assert_eq!(harness.events.expect_close().await.0, 4000);
}
