use std::path::PathBuf;
use thiserror::Error;

/// Startup failures. Nothing here is recoverable.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read map {path}: {source}")]
    MapLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad map: {0}")]
    MapFormat(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Misbehaviour by one session. Logged; the session stays connected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("session {session} sent a second shoot before the first was applied")]
    DuplicateShoot { session: String },
    #[error("session {session} sent a malformed message: {reason}")]
    Malformed { session: String, reason: String },
    #[error("session {session} sent a frame over {len} bytes")]
    FrameTooLarge { session: String, len: usize },
}

/// Failure to apply one queued event to the world.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no ball with id {0}")]
    UnknownBall(String),
    #[error("ball {0} is still moving")]
    BallMoving(String),
    #[error("ball {0} already exists")]
    DuplicateBall(String),
    #[error("ball {0} was struck with a zero or non-finite impulse")]
    InvalidImpulse(String),
    #[error("session {session} queued an event of unknown kind `{kind}`")]
    UnknownEvent { session: String, kind: String },
}
