//! Integration tests: a link talking to a fake rover over localhost TCP.

use std::time::Duration;

use rover_link::{
    ActiveReconnect, Link, LinkChannels, LinkConfig, LinkEvent, PeerInfo, ReconnectPolicy,
    TcpTransport,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .try_init();
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("local addr").port()
}

async fn next_event(channels: &mut LinkChannels) -> LinkEvent {
    timeout(Duration::from_secs(5), channels.events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Connect to a fake rover, exchange a message each way.
#[tokio::test]
async fn connect_and_exchange() {
    init_tracing();

    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let rover_addr = rover.local_addr().unwrap();

    let rover_task = tokio::spawn(async move {
        let (mut socket, _) = rover.accept().await.unwrap();
        socket.write_all(b"ready to start\n").await.unwrap();

        let mut buf = [0u8; 32];
        let n = socket.read(&mut buf).await.unwrap();
        buf[..n].to_vec()
    });

    let transport = TcpTransport::new("127.0.0.1:0");
    let mut channels = Link::spawn(transport, LinkConfig::default());

    let peer = PeerInfo::named(rover_addr.to_string(), "Rover");
    channels.handle.connect(peer.clone()).await.unwrap();

    assert_eq!(next_event(&mut channels).await, LinkEvent::Connected(peer));
    assert!(channels.handle.is_connected().await);
    assert_eq!(
        next_event(&mut channels).await,
        LinkEvent::DataReceived("ready to start".into())
    );

    channels.handle.send(&b"POSITION 1 4 9\n"[..]).await.unwrap();
    let received = rover_task.await.unwrap();
    assert_eq!(received, b"POSITION 1 4 9\n");

    assert_eq!(channels.handle.metrics().frames_received.get(), 1);
    assert_eq!(channels.handle.metrics().frames_sent.get(), 1);
}

/// A message fragmented across writes arrives whole, in order, exactly once.
#[tokio::test]
async fn fragmented_messages_reassemble() {
    init_tracing();

    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let rover_addr = rover.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = rover.accept().await.unwrap();
        socket.write_all(b"A\nB").await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        socket.write_all(b"\n").await.unwrap();
        socket.flush().await.unwrap();
        // Keep the socket open until the assertions are done.
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let mut channels = Link::spawn(TcpTransport::new("127.0.0.1:0"), LinkConfig::default());
    let peer = PeerInfo::new(rover_addr.to_string());
    channels.handle.connect(peer.clone()).await.unwrap();

    assert_eq!(next_event(&mut channels).await, LinkEvent::Connected(peer));
    assert_eq!(
        next_event(&mut channels).await,
        LinkEvent::DataReceived("A".into())
    );
    assert_eq!(
        next_event(&mut channels).await,
        LinkEvent::DataReceived("B".into())
    );
}

/// Remote close: one Disconnected, then the link re-arms its own endpoint
/// and the returning peer reconnects without any application involvement.
#[tokio::test]
async fn remote_close_triggers_automatic_recovery() {
    init_tracing();

    let rover = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let rover_addr = rover.local_addr().unwrap();
    let link_port = free_port();

    // First visit: accept, then hang up.
    let first_visit = tokio::spawn(async move {
        let (socket, _) = rover.accept().await.unwrap();
        drop(socket);
    });

    let config = LinkConfig::default().reconnect(ReconnectPolicy {
        // Passive recovery should win; keep the active path far away.
        active: ActiveReconnect::Continuous {
            interval: Duration::from_secs(60),
        },
        rearm_listen: true,
    });
    let mut channels = Link::spawn(
        TcpTransport::new(format!("127.0.0.1:{link_port}")),
        config,
    );

    let peer = PeerInfo::new(rover_addr.to_string());
    channels.handle.connect(peer.clone()).await.unwrap();
    assert_eq!(
        next_event(&mut channels).await,
        LinkEvent::Connected(peer.clone())
    );
    first_visit.await.unwrap();

    // Exactly one Disconnected for the loss.
    assert_eq!(next_event(&mut channels).await, LinkEvent::Disconnected);

    // The link is now listening again on its own endpoint; the rover
    // reconnects on its own initiative.
    let mut rover_socket = loop {
        match TcpStream::connect(("127.0.0.1", link_port)).await {
            Ok(socket) => break socket,
            Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    };

    assert_eq!(next_event(&mut channels).await, LinkEvent::Connected(peer));
    assert!(channels.handle.is_connected().await);

    rover_socket.write_all(b"mission complete\n").await.unwrap();
    assert_eq!(
        next_event(&mut channels).await,
        LinkEvent::DataReceived("mission complete".into())
    );
    assert_eq!(channels.handle.metrics().sessions_lost.get(), 1);
    assert_eq!(channels.handle.metrics().sessions_established.get(), 2);
}
