//! Inbound delivery and outbound framing through `PeerSocket`.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use bytes::Bytes;
use peerframe::{
    Chunkifier,
    Dechunkifier,
    DeliveryMode,
    LogicalMessage,
    ReadyState,
    SendError,
    SocketEvent,
    TransportConfig,
    upload::ExtractError,
};
use peerframe_testing::{Recorded, StubSignaller, rejection, text_frames};
use rstest::rstest;

mod common;
use common::{config, connect, open};

const STATUS: &str =
    r#"{"type":"data","id":"7","payload":{"data":{"jobQueue":{"name":"printer-1","jobs":[]}}}}"#;

fn chunkifier(config: &TransportConfig) -> Chunkifier {
    let fragmentation = config.fragmentation().expect("valid transport config");
    Chunkifier::new(fragmentation.frame_payload_cap, config.delivery_mode)
}

#[rstest]
#[case(DeliveryMode::ReliableOrdered, false)]
#[case(DeliveryMode::UnorderedUnreliable, false)]
#[case(DeliveryMode::UnorderedUnreliable, true)]
#[tokio::test]
async fn inbound_frames_become_one_message_event(
    config: TransportConfig,
    #[case] mode: DeliveryMode,
    #[case] reversed: bool,
) {
    let config = config.with_delivery_mode(mode);
    let mut harness = open(config.clone()).await;
    let mut frames = text_frames(STATUS, &config);
    assert!(frames.len() > 1);
    if reversed {
        frames.reverse();
    }

    harness.peer.deliver(frames);

    assert_eq!(
        harness.events.expect_message().await,
        (STATUS.to_owned(), Vec::new())
    );
    assert_eq!(harness.socket.ready_state(), ReadyState::Open);
}

#[rstest]
#[tokio::test]
async fn frames_received_during_the_handshake_follow_open(config: TransportConfig) {
    let mut harness = connect(config.clone(), StubSignaller::answering());

    harness.peer.deliver(text_frames(STATUS, &config));
    harness.peer.connect();

    harness.events.expect_open().await;
    assert_eq!(harness.events.expect_message().await.0, STATUS);
}

#[rstest]
#[tokio::test]
async fn rejection_as_first_message_is_unrecoverable(config: TransportConfig) {
    let mut harness = open(config.clone()).await;

    harness
        .peer
        .deliver(text_frames(&rejection("printer is offline"), &config));

    assert_eq!(
        harness.events.expect_error().await,
        (4400, "printer is offline".into())
    );
    assert_eq!(
        harness.events.expect_close().await,
        (4400, "printer is offline".into())
    );
}

#[rstest]
#[tokio::test]
async fn rejection_after_the_first_message_is_delivered(config: TransportConfig) {
    let mut harness = open(config.clone()).await;
    let chunkifier = chunkifier(&config);
    let refusal = rejection("late refusal");

    for text in [STATUS, refusal.as_str()] {
        let frames = chunkifier
            .chunk(&LogicalMessage::new(text))
            .expect("chunk")
            .encode()
            .expect("encode");
        harness.peer.deliver(frames);
    }

    assert_eq!(harness.events.expect_message().await.0, STATUS);
    assert_eq!(harness.events.expect_message().await.0, refusal);
    assert_eq!(harness.socket.ready_state(), ReadyState::Open);
}

#[rstest]
#[tokio::test]
async fn failing_listener_closes_with_the_message_data(config: TransportConfig) {
    let mut harness = open(config.clone()).await;
    harness
        .socket
        .add_event_listener("message", |_: &SocketEvent| Err("bad payload".into()));

    harness
        .peer
        .deliver(text_frames(r#"{"type":"data"}"#, &config));

    assert_eq!(harness.events.expect_message().await.0, r#"{"type":"data"}"#);
    assert_eq!(
        harness.events.next().await,
        Recorded::Close {
            code: 4000,
            reason: r#"Error receiving message: bad payload: "{\"type\":\"data\"}""#.into(),
        }
    );
}

#[rstest]
#[tokio::test]
async fn panicking_slot_stops_named_listeners(config: TransportConfig) {
    let mut harness = open(config.clone()).await;
    harness
        .socket
        .set_onmessage(|_: &SocketEvent| panic!("listener exploded"));

    harness.peer.deliver(text_frames(r#"{"n":1}"#, &config));

    assert_eq!(
        harness.events.next().await,
        Recorded::Close {
            code: 4000,
            reason: r#"Error receiving message: listener panicked: listener exploded: "{\"n\":1}""#
                .into(),
        }
    );
}

#[rstest]
#[tokio::test]
async fn removed_listeners_are_not_called(config: TransportConfig) {
    let mut harness = open(config.clone()).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = harness
        .socket
        .add_event_listener("message", move |_: &SocketEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    assert!(harness.socket.remove_event_listener("message", id));

    harness.peer.deliver(text_frames(STATUS, &config));

    harness.events.expect_message().await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn undecodable_frame_fails_the_socket(config: TransportConfig) {
    let mut harness = open(config).await;

    harness
        .peer
        .deliver([Bytes::from_static(b"definitely not a frame")]);

    let (code, _) = harness.events.expect_error().await;
    assert_eq!(code, 4000);
    assert_eq!(harness.events.expect_close().await.0, 4000);
}

#[rstest]
#[case(DeliveryMode::ReliableOrdered)]
#[case(DeliveryMode::UnorderedUnreliable)]
#[tokio::test]
async fn sent_operations_are_framed_for_the_channel(
    config: TransportConfig,
    #[case] mode: DeliveryMode,
) {
    let config = config.with_delivery_mode(mode);
    let harness = open(config.clone()).await;
    let query = r#"{"type":"start","id":"1","payload":{"query":"{ machines { id status } }"}}"#;
    let expected = text_frames(query, &config).len();

    harness.socket.send(query).expect("send");
    let sent = harness.peer.channel().wait_for_sent(expected).await;

    assert_eq!(sent.len(), expected);
    assert!(sent.iter().all(|frame| frame.len() <= config.max_frame_size));
    let mut dechunkifier = Dechunkifier::new(config.fragmentation().expect("config"), mode);
    let mut messages = sent
        .iter()
        .filter_map(|frame| dechunkifier.push(frame).expect("valid frame"));
    assert_eq!(messages.next().map(|m| m.text().to_owned()).as_deref(), Some(query));
}

#[rstest]
#[tokio::test]
async fn non_json_operations_are_refused_without_closing(config: TransportConfig) {
    let harness = open(config).await;

    let err = harness.socket.send("subscribe me").expect_err("not JSON");

    assert!(matches!(err, SendError::Extract(ExtractError::Json(_))));
    assert_eq!(harness.socket.ready_state(), ReadyState::Open);
    assert!(harness.peer.channel().sent().is_empty());
}
