//! Async TCP client for the minigolf server.
//!
//! `Client::connect` opens the stream and waits for the `ID` message, so a
//! connected client always knows its session id. Frames are decoded into an
//! inbox and handed out one `ServerMsg` at a time.

use std::collections::VecDeque;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::framing::{FrameDecoder, FrameError, DEFAULT_MAX_FRAME_LEN};
use crate::protocol::{decode_server_msg, ClientMsg, DecodeError, ServerMsg};

const READ_CHUNK: usize = 8192;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("server frame rejected: {0}")]
    Frame(#[from] FrameError),
    #[error("server message rejected: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("expected `ID` as the first message, got `{0}`")]
    Handshake(String),
    #[error("connection closed before the session id arrived")]
    Closed,
}

/// Receiving half: deframes and decodes server messages.
#[derive(Debug)]
pub struct ClientReader {
    stream: OwnedReadHalf,
    decoder: FrameDecoder,
    inbox: VecDeque<Result<ServerMsg, ClientError>>,
    buf: Vec<u8>,
}

impl ClientReader {
    fn new(stream: OwnedReadHalf) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(DEFAULT_MAX_FRAME_LEN),
            inbox: VecDeque::new(),
            buf: vec![0u8; READ_CHUNK],
        }
    }

    /// Next message from the server, or `Ok(None)` once the server closed
    /// the stream.
    ///
    /// A bad frame or payload is returned as an error for that message only;
    /// the reader stays usable. Cancel safe: the socket read is the only await
    /// point and decoded messages are kept in the inbox.
    pub async fn recv(&mut self) -> Result<Option<ServerMsg>, ClientError> {
        loop {
            if let Some(msg) = self.inbox.pop_front() {
                return msg.map(Some);
            }
            let n = self.stream.read(&mut self.buf).await?;
            if n == 0 {
                return Ok(None);
            }
            for payload in self.decoder.push(&self.buf[..n]) {
                let msg = payload
                    .map_err(ClientError::from)
                    .and_then(|payload| Ok(decode_server_msg(&payload)?));
                self.inbox.push_back(msg);
            }
        }
    }
}

/// Sending half: frames and writes client messages.
#[derive(Debug)]
pub struct ClientWriter {
    stream: OwnedWriteHalf,
}

impl ClientWriter {
    pub async fn send(&mut self, msg: &ClientMsg) -> Result<(), ClientError> {
        let frame = msg.to_frame()?;
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    /// Write bytes as they are, without framing.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    /// Close the write side; the server sees a clean disconnect.
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Client {
    id: String,
    reader: ClientReader,
    writer: ClientWriter,
}

impl Client {
    /// Connect and wait for the session id.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        let mut reader = ClientReader::new(read_half);

        let id = match reader.recv().await? {
            Some(ServerMsg::Id(id)) => id,
            Some(other) => return Err(ClientError::Handshake(message_type(&other).to_string())),
            None => return Err(ClientError::Closed),
        };
        tracing::debug!(session = %id, "Connected");

        Ok(Self {
            id,
            reader,
            writer: ClientWriter { stream: write_half },
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn recv(&mut self) -> Result<Option<ServerMsg>, ClientError> {
        self.reader.recv().await
    }

    pub async fn send(&mut self, msg: &ClientMsg) -> Result<(), ClientError> {
        self.writer.send(msg).await
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.writer.send_raw(bytes).await
    }

    /// Split into halves that can be driven from separate `select!` branches.
    pub fn into_split(self) -> (String, ClientReader, ClientWriter) {
        (self.id, self.reader, self.writer)
    }
}

fn message_type(msg: &ServerMsg) -> &'static str {
    match msg {
        ServerMsg::Id(_) => "ID",
        ServerMsg::Map(_) => "map",
        ServerMsg::Snapshot(_) => "msg",
        ServerMsg::Pong(_) => "PONG",
    }
}
