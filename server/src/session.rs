//! TCP sessions.
//!
//! One accept loop, and per connection a read loop plus a writer task. The
//! read loop turns frames into events on the shared queue; everything going
//! out to a client passes through its writer task's channel, so a stalled
//! socket never blocks the game loop or other sessions.

use crate::error::ProtocolError;
use crate::event::{Event, EventKind, EventQueue};
use crate::shutdown::Shutdown;
use minigolf_shared::framing::{FrameDecoder, FrameError};
use minigolf_shared::protocol::{decode_client_msg, ClientMsg, Empty, ServerMsg};
use minigolf_shared::vec2::Vec2;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// An encoded, framed message ready to write. Shared between recipients.
pub type Frame = Arc<[u8]>;

/// Frames a slow client may lag behind before further ones are dropped.
const OUTBOUND_QUEUE: usize = 64;
const READ_CHUNK: usize = 4096;

/// Open connections by session id.
#[derive(Default)]
pub struct ConnectionRegistry {
    senders: Mutex<HashMap<String, mpsc::Sender<Frame>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, mpsc::Sender<Frame>>> {
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, id: &str, tx: mpsc::Sender<Frame>) {
        self.lock().insert(id.to_string(), tx);
    }

    pub fn unregister(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Queue a frame for one session. False if it is gone or backed up.
    pub fn send_to(&self, id: &str, frame: Frame) -> bool {
        let tx = self.lock().get(id).cloned();
        tx.is_some_and(|tx| tx.try_send(frame).is_ok())
    }

    /// Queue a frame for every open session. Returns how many accepted it.
    ///
    /// Iterates over a copy of the registry, so sessions may come and go
    /// while a broadcast is in progress.
    pub fn broadcast(&self, frame: &Frame) -> usize {
        let targets: Vec<(String, mpsc::Sender<Frame>)> = self
            .lock()
            .iter()
            .map(|(id, tx)| (id.clone(), tx.clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(Arc::clone(frame)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(session = %id, "Outbound queue full, dropping frame");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }
}

/// Hands out `user_000`, `user_001`, ...
#[derive(Default)]
pub struct SessionIds {
    next: AtomicU64,
}

impl SessionIds {
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("user_{:03}", n)
    }
}

/// Everything a session needs, cloned into each connection task.
#[derive(Clone)]
pub struct SessionContext {
    pub events: Arc<EventQueue>,
    pub registry: Arc<ConnectionRegistry>,
    pub ids: Arc<SessionIds>,
    /// Encoded `map` message, identical for every connection.
    pub map_frame: Frame,
    pub read_timeout: Duration,
    pub max_frame_len: usize,
}

/// Accept connections until shutdown.
pub async fn run_accept_loop(listener: TcpListener, ctx: SessionContext, mut shutdown: Shutdown) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let id = ctx.ids.next_id();
                        tracing::info!(session = %id, %peer, "Client connected");
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(session = %id, "set_nodelay failed: {}", e);
                        }
                        tokio::spawn(handle_connection(stream, id, ctx.clone(), shutdown.clone()));
                    }
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning.
                        tracing::warn!("Accept failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
            _ = shutdown.wait() => break,
        }
    }
    tracing::info!("Accept loop ended");
}

/// Serve one client from accept to disconnect.
pub async fn handle_connection(stream: TcpStream, id: String, ctx: SessionContext, shutdown: Shutdown) {
    let (mut reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::channel::<Frame>(OUTBOUND_QUEUE);

    // ID then map, queued before the session is visible to broadcasts.
    let id_frame = match ServerMsg::Id(id.clone()).to_frame() {
        Ok(frame) => Frame::from(frame),
        Err(e) => {
            tracing::error!(session = %id, "Failed to encode ID: {}", e);
            return;
        }
    };
    if tx.try_send(id_frame).is_err() || tx.try_send(Arc::clone(&ctx.map_frame)).is_err() {
        return;
    }

    let writer_task = tokio::spawn(write_loop(writer, rx, id.clone()));
    ctx.registry.register(&id, tx.clone());
    push_event(&ctx, Event::new(id.as_str(), EventKind::UserAdd));

    let mut decoder = FrameDecoder::new(ctx.max_frame_len);
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        if shutdown.is_shutdown() || tx.is_closed() {
            break;
        }
        match tokio::time::timeout(ctx.read_timeout, reader.read(&mut buf)).await {
            Err(_elapsed) => continue,
            Ok(Ok(0)) => {
                tracing::debug!(session = %id, "Client closed the connection");
                break;
            }
            Ok(Ok(n)) => {
                for frame in decoder.push(&buf[..n]) {
                    if let Err(e) = handle_frame(&ctx, &id, &tx, frame) {
                        tracing::warn!(session = %id, "{}", e);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::info!(session = %id, "Read failed: {}", e);
                break;
            }
        }
    }

    ctx.registry.unregister(&id);
    push_event(&ctx, Event::new(id.as_str(), EventKind::UserRem));
    drop(tx);
    if shutdown.is_shutdown() {
        writer_task.abort();
    }
    tracing::info!(session = %id, "Client disconnected");
}

fn push_event(ctx: &SessionContext, event: Event) {
    if let Err(e) = ctx.events.push(event) {
        tracing::warn!("{}", e);
    }
}

/// Act on one deframed payload.
fn handle_frame(
    ctx: &SessionContext,
    id: &str,
    tx: &mpsc::Sender<Frame>,
    frame: Result<Vec<u8>, FrameError>,
) -> Result<(), ProtocolError> {
    let payload = frame.map_err(|FrameError::TooLarge { limit }| ProtocolError::FrameTooLarge {
        session: id.to_string(),
        len: limit,
    })?;
    let msg = decode_client_msg(&payload).map_err(|e| ProtocolError::Malformed {
        session: id.to_string(),
        reason: e.to_string(),
    })?;

    let kind = match msg {
        ClientMsg::Ping => {
            match ServerMsg::Pong(Empty {}).to_frame() {
                Ok(pong) => {
                    if tx.try_send(Frame::from(pong)).is_err() {
                        tracing::debug!(session = %id, "Outbound queue full, dropping PONG");
                    }
                }
                Err(e) => tracing::error!(session = %id, "Failed to encode PONG: {}", e),
            }
            return Ok(());
        }
        ClientMsg::Shoot(shoot) => EventKind::UserShoot {
            vector: Vec2::from(shoot.vector),
        },
        ClientMsg::Respawn => EventKind::UserRespawn,
        ClientMsg::Unknown(kind) => EventKind::Unknown(kind),
    };
    ctx.events.push(Event::new(id, kind))
}

/// Drain the outbound channel onto the socket. Ends on the first write
/// error, which the read loop notices through the closed channel.
async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<Frame>, id: String) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            tracing::info!(session = %id, "Write failed: {}", e);
            return;
        }
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_sequential_and_padded() {
        let ids = SessionIds::default();
        assert_eq!(ids.next_id(), "user_000");
        assert_eq!(ids.next_id(), "user_001");
        for _ in 0..998 {
            ids.next_id();
        }
        assert_eq!(ids.next_id(), "user_1000");
    }

    #[tokio::test]
    async fn broadcast_reaches_every_open_session() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let (tx_c, rx_c) = mpsc::channel(4);
        registry.register("user_000", tx_a);
        registry.register("user_001", tx_b);
        registry.register("user_002", tx_c);
        drop(rx_c);

        let frame: Frame = Arc::from(&b"\x02{}\x03"[..]);
        assert_eq!(registry.broadcast(&frame), 2);
        assert_eq!(&*rx_a.recv().await.unwrap(), b"\x02{}\x03");
        assert_eq!(&*rx_b.recv().await.unwrap(), b"\x02{}\x03");
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        registry.register("user_000", tx);

        let frame: Frame = Arc::from(&b"x"[..]);
        assert_eq!(registry.broadcast(&frame), 1);
        assert_eq!(registry.broadcast(&frame), 0);
        assert!(!registry.send_to("user_000", frame));
    }

    #[test]
    fn unregister_removes() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        registry.register("user_000", tx);
        assert_eq!(registry.ids(), vec!["user_000".to_string()]);
        assert!(registry.unregister("user_000"));
        assert!(!registry.unregister("user_000"));
        assert!(registry.is_empty());
    }

    fn context() -> SessionContext {
        SessionContext {
            events: Arc::new(EventQueue::new()),
            registry: Arc::new(ConnectionRegistry::new()),
            ids: Arc::new(SessionIds::default()),
            map_frame: Arc::from(&b""[..]),
            read_timeout: Duration::from_millis(50),
            max_frame_len: 1024,
        }
    }

    #[tokio::test]
    async fn frames_become_events() {
        let ctx = context();
        let (tx, _rx) = mpsc::channel(4);
        handle_frame(
            &ctx,
            "user_000",
            &tx,
            Ok(br#"{"type":"shoot","content":{"vector":[0.1,0]}}"#.to_vec()),
        )
        .unwrap();
        handle_frame(&ctx, "user_000", &tx, Ok(br#"{"type":"respawn","content":{}}"#.to_vec()))
            .unwrap();

        let events = ctx.events.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].kind,
            EventKind::UserShoot {
                vector: Vec2::from_cartesian(0.1, 0.0)
            }
        );
        assert_eq!(events[1].kind, EventKind::UserRespawn);
    }

    #[tokio::test]
    async fn ping_is_answered_directly() {
        let ctx = context();
        let (tx, mut rx) = mpsc::channel(4);
        handle_frame(&ctx, "user_000", &tx, Ok(br#"{"type":"PING","content":{}}"#.to_vec()))
            .unwrap();
        assert!(ctx.events.is_empty());
        let frame = rx.recv().await.unwrap();
        assert_eq!(&frame[1..frame.len() - 1], br#"{"type":"PONG","content":{}}"#);
    }

    #[tokio::test]
    async fn protocol_errors_are_reported() {
        let ctx = context();
        let (tx, _rx) = mpsc::channel(4);

        let err = handle_frame(&ctx, "user_000", &tx, Ok(b"not json".to_vec())).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { .. }));

        let err = handle_frame(&ctx, "user_000", &tx, Err(FrameError::TooLarge { limit: 1024 }))
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::FrameTooLarge {
                session: "user_000".to_string(),
                len: 1024
            }
        );

        let shoot = br#"{"type":"shoot","content":{"vector":[0.1,0]}}"#.to_vec();
        handle_frame(&ctx, "user_000", &tx, Ok(shoot.clone())).unwrap();
        let err = handle_frame(&ctx, "user_000", &tx, Ok(shoot)).unwrap_err();
        assert!(matches!(err, ProtocolError::DuplicateShoot { .. }));
    }

    #[tokio::test]
    async fn unknown_type_is_forwarded() {
        let ctx = context();
        let (tx, _rx) = mpsc::channel(4);
        handle_frame(&ctx, "user_000", &tx, Ok(br#"{"type":"warp","content":{}}"#.to_vec()))
            .unwrap();
        let events = ctx.events.drain();
        assert_eq!(events[0].kind, EventKind::Unknown("warp".to_string()));
    }
}
