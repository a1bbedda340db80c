//! Integration tests for the minigolf server.
//!
//! These tests start a real server instance and connect over TCP
//! to verify end-to-end behavior.

use minigolf_server::config::ServerConfig;
use minigolf_server::server::Server;
use minigolf_server::shutdown::{self, ShutdownTrigger};
use minigolf_shared::client::Client;
use minigolf_shared::framing::encode_frame;
use minigolf_shared::protocol::{ClientMsg, ServerMsg, ShootContent, SnapshotMsg};
use std::net::SocketAddr;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Start a test server on a random available port.
async fn start_test_server() -> (SocketAddr, ShutdownTrigger) {
    let config = ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        tick_rate_hz: 60,
        broadcast_rate_hz: 30,
        read_timeout_ms: 50,
        ..Default::default()
    };
    let server = Server::bind(config).await.expect("server should bind");
    let addr = server.local_addr().unwrap();
    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(server.run(shutdown));
    (addr, trigger)
}

async fn connect(addr: SocketAddr) -> Client {
    tokio::time::timeout(RECV_TIMEOUT, Client::connect(addr))
        .await
        .expect("timed out waiting for ID")
        .expect("Failed to connect")
}

/// Connect and read past the map message every client gets after its ID.
async fn join(addr: SocketAddr) -> (Client, String) {
    let mut client = connect(addr).await;
    match recv(&mut client).await {
        Some(ServerMsg::Map(_)) => {}
        other => panic!("Expected map after ID, got {:?}", other),
    }
    let id = client.id().to_string();
    (client, id)
}

/// Next server message, or None on timeout or close.
async fn recv(client: &mut Client) -> Option<ServerMsg> {
    tokio::time::timeout(RECV_TIMEOUT, client.recv())
        .await
        .ok()?
        .ok()?
}

/// Skip ahead to the next snapshot.
async fn recv_snapshot(client: &mut Client) -> SnapshotMsg {
    loop {
        match recv(client).await {
            Some(ServerMsg::Snapshot(snap)) => return snap,
            Some(_) => continue,
            None => panic!("no snapshot received"),
        }
    }
}

#[tokio::test]
async fn test_connect_receives_id_then_map() {
    let (addr, _trigger) = start_test_server().await;
    let mut client = connect(addr).await;
    assert!(client.id().starts_with("user_"));

    match recv(&mut client).await {
        Some(ServerMsg::Map(map)) => {
            assert_eq!(map.segments.len(), 5);
        }
        other => panic!("Expected map, got {:?}", other),
    }
}

#[tokio::test]
async fn test_multiple_clients_get_unique_ids() {
    let (addr, _trigger) = start_test_server().await;

    let mut ids = Vec::new();
    let mut clients = Vec::new();
    for _ in 0..5 {
        let (client, id) = join(addr).await;
        ids.push(id);
        clients.push(client);
    }

    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "IDs should be unique: {:?}", ids);
}

#[tokio::test]
async fn test_new_ball_appears_in_snapshot() {
    let (addr, _trigger) = start_test_server().await;
    let (mut client, id) = join(addr).await;

    for _ in 0..10 {
        let snap = recv_snapshot(&mut client).await;
        if let Some(ball) = snap.balls.iter().find(|b| b.id == id) {
            assert_eq!(ball.tries, 0);
            assert!(!ball.on_target);
            assert_eq!(ball.vel, [0.0, 0.0]);
            return;
        }
    }
    panic!("ball {} never appeared", id);
}

#[tokio::test]
async fn test_shoot_moves_ball_then_decays() {
    let (addr, _trigger) = start_test_server().await;
    let (mut client, id) = join(addr).await;

    // Wait until the ball exists before shooting
    loop {
        let snap = recv_snapshot(&mut client).await;
        if snap.balls.iter().any(|b| b.id == id) {
            break;
        }
    }

    client
        .send(&ClientMsg::Shoot(ShootContent { vector: [0.1, 0.0] }))
        .await
        .unwrap();

    let mut speeds = Vec::new();
    let mut tries = 0;
    for _ in 0..40 {
        let snap = recv_snapshot(&mut client).await;
        let ball = snap.balls.iter().find(|b| b.id == id).unwrap();
        tries = ball.tries;
        let speed = (ball.vel[0].powi(2) + ball.vel[1].powi(2)).sqrt();
        if speed > 0.0 || !speeds.is_empty() {
            speeds.push(speed);
        }
    }

    assert_eq!(tries, 1);
    assert!(speeds.len() >= 2, "ball never moved");
    assert!(speeds[0] > 0.0);
    assert!(
        speeds.last().unwrap() < &speeds[0],
        "speed should decay: {:?}",
        speeds
    );
}

#[tokio::test]
async fn test_disconnect_removes_ball() {
    let (addr, _trigger) = start_test_server().await;
    let (mut observer, _) = join(addr).await;
    let (leaver, leaver_id) = join(addr).await;

    loop {
        let snap = recv_snapshot(&mut observer).await;
        if snap.balls.iter().any(|b| b.id == leaver_id) {
            break;
        }
    }

    drop(leaver);

    for _ in 0..30 {
        let snap = recv_snapshot(&mut observer).await;
        if snap.balls.iter().all(|b| b.id != leaver_id) {
            return;
        }
    }
    panic!("ball {} still present after disconnect", leaver_id);
}

#[tokio::test]
async fn test_ping_gets_pong() {
    let (addr, _trigger) = start_test_server().await;
    let (mut client, _) = join(addr).await;

    client.send(&ClientMsg::Ping).await.unwrap();
    loop {
        match recv(&mut client).await {
            Some(ServerMsg::Pong(_)) => break,
            Some(_) => continue,
            None => panic!("no PONG received"),
        }
    }
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let (addr, _trigger) = start_test_server().await;
    let (mut client, _) = join(addr).await;

    client.send_raw(&encode_frame(b"{definitely not json")).await.unwrap();
    client.send_raw(&encode_frame(&[0xff, 0xfe, 0xfd])).await.unwrap();
    client
        .send_raw(&encode_frame(br#"{"type":"teleport","content":{}}"#))
        .await
        .unwrap();
    client.send_raw(b"stray bytes outside any frame").await.unwrap();

    client.send(&ClientMsg::Ping).await.unwrap();
    loop {
        match recv(&mut client).await {
            Some(ServerMsg::Pong(_)) => break,
            Some(_) => continue,
            None => panic!("connection dropped after malformed input"),
        }
    }
}

#[tokio::test]
async fn test_respawn_returns_ball_to_spawn() {
    let (addr, _trigger) = start_test_server().await;
    let (mut client, id) = join(addr).await;

    let spawn = loop {
        let snap = recv_snapshot(&mut client).await;
        if let Some(ball) = snap.balls.iter().find(|b| b.id == id) {
            break (ball.x, ball.y);
        }
    };

    client
        .send(&ClientMsg::Shoot(ShootContent { vector: [0.0, 0.3] }))
        .await
        .unwrap();
    // Let it roll a little
    for _ in 0..5 {
        recv_snapshot(&mut client).await;
    }
    client.send(&ClientMsg::Respawn).await.unwrap();

    for _ in 0..20 {
        let snap = recv_snapshot(&mut client).await;
        let ball = snap.balls.iter().find(|b| b.id == id).unwrap();
        if (ball.x, ball.y) == spawn && ball.vel == [0.0, 0.0] {
            assert_eq!(ball.tries, 1);
            return;
        }
    }
    panic!("ball never returned to spawn");
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let (addr, trigger) = start_test_server().await;
    let (mut client, _) = join(addr).await;

    trigger.shutdown();

    // Drain until the server closes the socket
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        while recv(&mut client).await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "session still open after shutdown");
}
