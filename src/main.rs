//! Demo binary sending one operation over a loopback peer socket.
//!
//! Parses CLI arguments, stages attachment files, and prints the reply
//! produced by the in-memory remote peer.

mod cli;

use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use peerframe::{
    CloseCode,
    DeliveryMode,
    PeerSocket,
    PendingUploads,
    ReadyState,
    SocketEvent,
    TransportConfig,
    loopback::LoopbackConnector,
};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

fn default_operation(placeholders: &[String]) -> String {
    json!({
        "type": "start",
        "id": "1",
        "payload": {
            "query": "mutation($files: [Upload!]!) { upload(files: $files) { id } }",
            "variables": { "files": placeholders },
        },
    })
    .to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable structured logging for the demo.
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let mode = match cli.mode {
        cli::ModeArg::Ordered => DeliveryMode::ReliableOrdered,
        cli::ModeArg::Unordered => DeliveryMode::UnorderedUnreliable,
    };
    let config = TransportConfig::default()
        .with_delivery_mode(mode)
        .with_max_frame_size(cli.frame_size);
    let connector = LoopbackConnector::new(&config)?;

    let uploads = Arc::new(PendingUploads::new());
    let mut placeholders = Vec::with_capacity(cli.attachments.len());
    for path in &cli.attachments {
        let blob = Bytes::from(std::fs::read(path)?);
        info!(path = %path.display(), bytes = blob.len(), "staged attachment");
        placeholders.push(uploads.stage(blob));
    }
    let operation = cli
        .operation
        .unwrap_or_else(|| default_operation(&placeholders));

    let options = connector
        .options()
        .with_uploads(Arc::clone(&uploads))
        .on_signalling_success(|| info!("signalling complete"));
    let socket = PeerSocket::connect("loopback://peerframe", "graphql-ws", options)?;

    let (opened_tx, mut opened) = mpsc::unbounded_channel();
    socket.set_onopen(move |_: &SocketEvent| Ok(opened_tx.send(())?));
    let (replies_tx, mut replies) = mpsc::unbounded_channel();
    socket.set_onmessage(move |event: &SocketEvent| {
        if let Some(message) = event.as_message() {
            replies_tx.send(message.data().to_owned())?;
        }
        Ok(())
    });

    let mut remote = connector
        .remote()
        .await
        .ok_or("loopback peer was never created")?;
    if socket.ready_state() == ReadyState::Connecting {
        opened.recv().await;
    }
    socket.send(&operation)?;

    let received = remote
        .recv_message()
        .await
        .ok_or("socket closed before the operation arrived")??;
    let sizes: Vec<usize> = received.attachments().iter().map(Bytes::len).collect();
    remote.send_text(
        json!({
            "type": "data",
            "id": "1",
            "payload": { "data": { "received": received.text().len(), "attachments": sizes } },
        })
        .to_string(),
    )?;

    if let Some(reply) = replies.recv().await {
        println!("{reply}");
    }
    socket.close(CloseCode::NORMAL, "done");
    socket.closed().await;
    Ok(())
}
