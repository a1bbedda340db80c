use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use ts_rs::TS;

use crate::framing::encode_frame;
use crate::map::MapData;

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum ServerMsg {
    /// Session id, sent once right after accept.
    #[serde(rename = "ID")]
    Id(String),
    #[serde(rename = "map")]
    Map(MapData),
    #[serde(rename = "msg")]
    Snapshot(SnapshotMsg),
    #[serde(rename = "PONG")]
    Pong(Empty),
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../target/ts-bindings/")]
pub struct SnapshotMsg {
    pub balls: Vec<BallWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../target/ts-bindings/")]
pub struct BallWire {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub vel: [f64; 2],
    pub tries: u32,
    pub on_target: bool,
}

// === Client -> Server ===

pub const SHOOT: &str = "shoot";
pub const RESPAWN: &str = "respawn";
pub const PING: &str = "PING";

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMsg {
    Shoot(ShootContent),
    Respawn,
    Ping,
    /// A well-formed envelope whose `type` this server does not know.
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../target/ts-bindings/")]
pub struct ShootContent {
    pub vector: [f64; 2],
}

/// `{"type": ..., "content": ...}` before the content is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not a message envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad content for `{kind}`: {reason}")]
    BadContent { kind: String, reason: String },
}

impl ClientMsg {
    pub fn kind(&self) -> &str {
        match self {
            ClientMsg::Shoot(_) => SHOOT,
            ClientMsg::Respawn => RESPAWN,
            ClientMsg::Ping => PING,
            ClientMsg::Unknown(kind) => kind,
        }
    }

    pub fn to_frame(&self) -> Result<Vec<u8>, serde_json::Error> {
        let content = match self {
            ClientMsg::Shoot(shoot) => serde_json::to_value(shoot)?,
            _ => Value::Object(serde_json::Map::new()),
        };
        let envelope = Envelope {
            kind: self.kind().to_string(),
            content,
        };
        Ok(encode_frame(&serde_json::to_vec(&envelope)?))
    }
}

/// Decode one deframed payload from a client.
pub fn decode_client_msg(payload: &[u8]) -> Result<ClientMsg, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    let envelope: Envelope = serde_json::from_str(text)?;

    match envelope.kind.as_str() {
        SHOOT => {
            let shoot: ShootContent =
                serde_json::from_value(envelope.content).map_err(|e| DecodeError::BadContent {
                    kind: envelope.kind.clone(),
                    reason: e.to_string(),
                })?;
            Ok(ClientMsg::Shoot(shoot))
        }
        RESPAWN => Ok(ClientMsg::Respawn),
        PING => Ok(ClientMsg::Ping),
        _ => Ok(ClientMsg::Unknown(envelope.kind)),
    }
}

impl ServerMsg {
    pub fn to_frame(&self) -> Result<Vec<u8>, serde_json::Error> {
        Ok(encode_frame(&serde_json::to_vec(self)?))
    }
}

pub fn decode_server_msg(payload: &[u8]) -> Result<ServerMsg, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str(text)?)
}

// === Conversion helpers ===

/// Round to 4 decimal places (plenty for normalized coordinates, keeps snapshots small)
#[inline]
pub fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}
