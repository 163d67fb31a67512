use std::time::Duration;

use flotilla_sync::transport::ws::{WsConnector, WsError};
use flotilla_sync::{
    ConnectionManager, ConnectionState, Connector, Link, TransportEvent, TransportSettings,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Accepts one websocket client, sends `frames` followed by a close frame.
async fn serve_once(frames: Vec<Message>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        for frame in frames {
            ws.send(frame).await.unwrap();
        }
        ws.close(None).await.unwrap();
        // finish the closing handshake
        while let Some(Ok(_)) = ws.next().await {}
    });

    (url, server)
}

async fn next_event(events: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
    timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("timed out waiting for a transport event")
        .expect("transport event stream closed")
}

#[tokio::test]
async fn link_yields_text_and_utf8_binary_until_close() {
    init_tracing();
    let (url, server) = serve_once(vec![
        Message::text(r#"{"type":"drone_update"}"#.to_owned()),
        Message::binary(b"from binary".to_vec()),
        Message::binary(vec![0xff, 0xfe, 0xfd]),
        Message::text("last".to_owned()),
    ])
    .await;

    let mut link = match WsConnector::new(url).connect().await {
        Ok(link) => link,
        Err(e) => panic!("connect failed: {e}"),
    };

    let mut received = Vec::new();
    while let Some(result) = timeout(Duration::from_secs(10), link.recv())
        .await
        .expect("timed out waiting for a frame")
    {
        received.push(result.expect("websocket error"));
    }

    // the non UTF-8 binary frame is dropped
    assert_eq!(
        received,
        vec![r#"{"type":"drone_update"}"#, "from binary", "last"]
    );

    drop(link);
    server.await.unwrap();
}

#[tokio::test]
async fn close_frame_ends_the_session() {
    init_tracing();
    let (url, server) = serve_once(vec![Message::text("hello".to_owned())]).await;

    let settings = TransportSettings {
        reconnect_delay: Duration::from_secs(60),
        event_buffer: 16,
    };
    let (manager, mut events) = ConnectionManager::spawn(WsConnector::new(url), settings);

    let mut seen = Vec::new();
    loop {
        match next_event(&mut events).await {
            TransportEvent::State(status) => {
                seen.push(status.state);
                if status.state == ConnectionState::Disconnected {
                    break;
                }
            }
            TransportEvent::Message(message) => assert_eq!(message, "hello"),
        }
    }
    assert_eq!(
        seen,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
        ]
    );

    server.await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn silent_server_fails_the_handshake_in_time() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    // accept the TCP connection but never answer the upgrade
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((tcp, _)) = listener.accept().await {
            held.push(tcp);
        }
    });

    let connector = WsConnector::new(url).with_connect_timeout(Duration::from_millis(200));
    let result = timeout(Duration::from_secs(5), connector.connect())
        .await
        .expect("connect did not give up");

    match result {
        Err(WsError::Timeout(after)) => assert_eq!(after, Duration::from_millis(200)),
        Err(other) => panic!("expected a timeout, got {other}"),
        Ok(_) => panic!("handshake unexpectedly succeeded"),
    }

    server.abort();
}
