//! End-to-end sessions over the in-memory loopback peer.

use bytes::Bytes;
use peerframe::{
    DeliveryMode,
    LogicalMessage,
    PeerSocket,
    TransportConfig,
    channel::IceConnectionState,
    loopback::{LoopbackConnector, LoopbackRemote},
};
use peerframe_testing::{EventRecorder, rejection};
use rstest::rstest;

async fn connect(mode: DeliveryMode) -> (PeerSocket, LoopbackRemote, EventRecorder) {
    let config = TransportConfig::default()
        .with_delivery_mode(mode)
        .with_max_frame_size(40);
    let connector = LoopbackConnector::new(&config).expect("valid transport config");
    let socket =
        PeerSocket::connect("loopback://e2e", "graphql-ws", connector.options()).expect("connect");
    let mut events = EventRecorder::attach(&socket);
    let remote = connector.remote().await.expect("remote");
    events.expect_open().await;
    (socket, remote, events)
}

#[rstest]
#[case(DeliveryMode::ReliableOrdered)]
#[case(DeliveryMode::UnorderedUnreliable)]
#[tokio::test]
async fn attachments_from_the_remote_reach_listeners(#[case] mode: DeliveryMode) {
    let (_socket, remote, mut events) = connect(mode).await;
    let snapshot = Bytes::from(vec![0xAB; 200]);
    let message = LogicalMessage::with_attachments(
        r##"{"type":"data","payload":{"data":{"snapshot":"#__graphql_file__:0"}}}"##,
        vec![snapshot.clone(), Bytes::new()],
    );

    remote.send_message(&message).expect("remote send");

    let (data, attachments) = events.expect_message().await;
    assert_eq!(data, message.text());
    assert_eq!(attachments, [snapshot, Bytes::new()]);
}

#[tokio::test]
async fn consecutive_messages_keep_their_order() {
    let (_socket, remote, mut events) = connect(DeliveryMode::ReliableOrdered).await;

    for n in 0..5 {
        remote
            .send_text(format!(r#"{{"type":"data","id":"{n}","payload":{{}}}}"#))
            .expect("remote send");
    }

    for n in 0..5 {
        let (data, _) = events.expect_message().await;
        assert!(data.contains(&format!(r#""id":"{n}""#)));
    }
}

#[tokio::test]
async fn remote_rejection_closes_with_4400() {
    let (socket, remote, mut events) = connect(DeliveryMode::UnorderedUnreliable).await;

    remote
        .send_text(rejection("unauthorized"))
        .expect("remote send");

    assert_eq!(events.expect_error().await, (4400, "unauthorized".into()));
    assert_eq!(events.expect_close().await, (4400, "unauthorized".into()));
    assert_eq!(socket.ready_state(), peerframe::ReadyState::Closed);
}

#[tokio::test]
async fn closing_the_socket_releases_the_loopback_peer() {
    let (socket, mut remote, mut events) = connect(DeliveryMode::ReliableOrdered).await;

    socket.close(1000, "done");
    assert_eq!(events.expect_close().await, (1000, "done".into()));

    // The driver releases the peer once it observes the shutdown.
    assert!(remote.recv_frame().await.is_none());
    assert!(remote.is_local_closed());
}

#[tokio::test]
async fn remote_ice_disconnect_is_reported() {
    let (_socket, remote, mut events) = connect(DeliveryMode::UnorderedUnreliable).await;

    remote.set_ice_state(IceConnectionState::Disconnected);

    assert_eq!(events.expect_error().await.0, 4444);
    assert_eq!(events.expect_close().await.0, 4444);
}
