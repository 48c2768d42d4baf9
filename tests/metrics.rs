#![cfg(feature = "metrics")]
//! Tests for `peerframe` metrics helpers.
//!
//! These tests verify that counters update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.

use peerframe::{
    DeliveryMode,
    PeerSocket,
    SocketEvent,
    TransportConfig,
    loopback::LoopbackConnector,
    metrics::{self as peer_metrics, Direction},
};
use peerframe_testing::{
    CounterSnapshot,
    EventRecorder,
    Recorded,
    counter_value,
    debugging_recorder_setup,
};
use rstest::rstest;

#[rstest]
#[case(Direction::Inbound, "inbound")]
#[case(Direction::Outbound, "outbound")]
fn frame_metric_is_labelled_by_direction(#[case] direction: Direction, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || peer_metrics::inc_frames(direction));

    assert_eq!(
        counter_value(
            &snapshotter,
            peer_metrics::FRAMES_PROCESSED,
            Some(("direction", label))
        ),
        1
    );
}

#[rstest]
#[case(1)]
#[case(3)]
fn eviction_counter_counts(#[case] expected: u64) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        (0..expected).for_each(|_| peer_metrics::inc_evictions());
    });

    assert_eq!(
        counter_value(&snapshotter, peer_metrics::REASSEMBLY_EVICTIONS, None),
        expected
    );
}

#[test]
fn a_session_records_frames_messages_and_panics() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    metrics::with_local_recorder(&recorder, || {
        runtime.block_on(async {
            let config = TransportConfig::default()
                .with_delivery_mode(DeliveryMode::ReliableOrdered)
                .with_max_frame_size(64);
            let connector = LoopbackConnector::new(&config).expect("config");
            let socket = PeerSocket::connect("loopback://metrics", "", connector.options())
                .expect("connect");
            let mut events = EventRecorder::attach(&socket);
            let mut remote = connector.remote().await.expect("remote");
            events.expect_open().await;

            remote
                .send_text(r#"{"type":"data","payload":{"data":{"ok":true}}}"#)
                .expect("remote send");
            events.expect_message().await;

            socket
                .send(r#"{"type":"start","payload":{"query":"{ ping }"}}"#)
                .expect("send");
            remote
                .recv_message()
                .await
                .expect("frames")
                .expect("reassembled");

            socket.set_onmessage(|_: &SocketEvent| panic!("metrics listener"));
            remote.send_text(r#"{"n":2}"#).expect("remote send");
            assert!(matches!(events.next().await, Recorded::Close { code: 4000, .. }));
        });
    });

    let counters = CounterSnapshot::take(&snapshotter);
    assert_eq!(counters.counter(peer_metrics::MESSAGES_DELIVERED, None), 2);
    assert_eq!(counters.counter(peer_metrics::LISTENER_PANICS, None), 1);
    assert!(
        counters.counter(
            peer_metrics::FRAMES_PROCESSED,
            Some(("direction", "inbound"))
        ) >= 2
    );
    assert!(
        counters.counter(
            peer_metrics::FRAMES_PROCESSED,
            Some(("direction", "outbound"))
        ) >= 1
    );
}

#[test]
fn one_snapshot_answers_repeated_queries() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        peer_metrics::inc_frames(Direction::Inbound);
        peer_metrics::inc_frames(Direction::Outbound);
        peer_metrics::inc_listener_panics();
    });

    let counters = CounterSnapshot::take(&snapshotter);
    assert_eq!(counters.counter(peer_metrics::LISTENER_PANICS, None), 1);
    assert_eq!(counters.counter(peer_metrics::LISTENER_PANICS, None), 1);
    assert_eq!(counters.counter(peer_metrics::FRAMES_PROCESSED, None), 2);
    assert_eq!(
        counters.counter(
            peer_metrics::FRAMES_PROCESSED,
            Some(("direction", "outbound"))
        ),
        1
    );
}
