//! Attachment placeholders travel as positional pointers plus binary parts.

use std::sync::Arc;

use bytes::Bytes;
use peerframe::{
    DeliveryMode,
    PeerSocket,
    PendingUploads,
    SendError,
    TransportConfig,
    loopback::{LoopbackConnector, LoopbackRemote},
    upload::ExtractError,
};
use peerframe_testing::EventRecorder;
use rstest::{fixture, rstest};

struct Session {
    socket: PeerSocket,
    remote: LoopbackRemote,
    uploads: Arc<PendingUploads>,
}

#[fixture]
fn uploads() -> Arc<PendingUploads> { Arc::new(PendingUploads::new()) }

async fn session(mode: DeliveryMode, uploads: Arc<PendingUploads>) -> Session {
    let config = TransportConfig::default()
        .with_delivery_mode(mode)
        .with_max_frame_size(48);
    let connector = LoopbackConnector::new(&config).expect("valid transport config");
    let socket = PeerSocket::connect(
        "loopback://uploads",
        "graphql-ws",
        connector.options().with_uploads(Arc::clone(&uploads)),
    )
    .expect("connect");
    let mut events = EventRecorder::attach(&socket);
    let remote = connector.remote().await.expect("remote");
    events.expect_open().await;
    Session {
        socket,
        remote,
        uploads,
    }
}

fn start(variables: &str) -> String {
    format!(r#"{{"type":"start","id":"1","payload":{{"query":"mutation","variables":{variables}}}}}"#)
}

#[rstest]
#[case(DeliveryMode::ReliableOrdered)]
#[case(DeliveryMode::UnorderedUnreliable)]
#[tokio::test]
async fn staged_blobs_arrive_as_attachments(
    uploads: Arc<PendingUploads>,
    #[case] mode: DeliveryMode,
) {
    let mut session = session(mode, uploads).await;
    let gcode = Bytes::from(b"G28\nG1 X10 Y10 F3000\nM104 S200\n".repeat(4));
    let image = Bytes::from_static(b"\x89PNG\r\n\x1a\n");
    let first = session.uploads.insert("gcode", gcode.clone());
    let second = session.uploads.insert("thumbnail", image.clone());
    let spare = session.uploads.stage(Bytes::from_static(b"unused"));

    session
        .socket
        .send(&start(&format!(
            r#"{{"files":["{first}","{second}"],"name":"benchy"}}"#
        )))
        .expect("send");

    let message = session
        .remote
        .recv_message()
        .await
        .expect("frames")
        .expect("reassembled");
    assert_eq!(
        message.text(),
        start(r##"{"files":["#__graphql_file__:0","#__graphql_file__:1"],"name":"benchy"}"##)
    );
    assert_eq!(message.attachments(), [gcode, image]);
    assert_eq!(session.uploads.len(), 1);
    assert!(session.uploads.contains("upload-0"));
    assert!(spare.ends_with("upload-0"));
}

#[rstest]
#[tokio::test]
async fn missing_blob_fails_the_send_and_restores_claims(uploads: Arc<PendingUploads>) {
    let mut session = session(DeliveryMode::UnorderedUnreliable, uploads).await;
    let present = session.uploads.insert("present", Bytes::from_static(b"blob"));

    let err = session
        .socket
        .send(&start(&format!(
            r##"{{"a":"{present}","b":"#__graphql_file__:absent"}}"##
        )))
        .expect_err("absent blob");

    match err {
        SendError::Extract(ExtractError::FilePointerMissing { placeholder }) => {
            assert_eq!(placeholder, "#__graphql_file__:absent");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(session.uploads.contains("present"));
    assert!(session.remote.drain().is_empty());

    session
        .socket
        .send(r#"{"type":"start","payload":{"variables":{}}}"#)
        .expect("socket still open");
    assert!(session.remote.recv_message().await.is_some());
}

#[rstest]
#[tokio::test]
async fn text_without_placeholders_is_sent_verbatim(uploads: Arc<PendingUploads>) {
    let mut session = session(DeliveryMode::ReliableOrdered, uploads).await;
    let text = r#"{ "type" : "start", "payload" : { "variables" : { "id" : 3 } } }"#;

    session.socket.send(text).expect("send");

    let message = session
        .remote
        .recv_message()
        .await
        .expect("frames")
        .expect("reassembled");
    assert_eq!(message.text(), text);
    assert!(message.attachments().is_empty());
}
