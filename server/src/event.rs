use crate::error::ProtocolError;
use minigolf_shared::vec2::Vec2;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    UserAdd,
    UserRem,
    /// Normalized aim vector as sent by the client.
    UserShoot { vector: Vec2 },
    UserRespawn,
    /// A message type this server does not understand, kept so the
    /// dispatcher can report it.
    Unknown(String),
}

impl EventKind {
    pub fn name(&self) -> &str {
        match self {
            EventKind::UserAdd => "user_add",
            EventKind::UserRem => "user_rem",
            EventKind::UserShoot { .. } => "user_shoot",
            EventKind::UserRespawn => "user_respawn",
            EventKind::Unknown(kind) => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub session: String,
    pub timestamp: SystemTime,
    pub kind: EventKind,
}

impl Event {
    pub fn new(session: impl Into<String>, kind: EventKind) -> Self {
        Self {
            session: session.into(),
            timestamp: SystemTime::now(),
            kind,
        }
    }
}

#[derive(Default)]
struct Inner {
    events: VecDeque<Event>,
    pending_shoot: HashSet<String>,
}

/// FIFO shared by every session (producers) and the game loop (consumer).
///
/// At most one shoot per session may wait in the queue.
#[derive(Default)]
pub struct EventQueue {
    inner: Mutex<Inner>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner holds plain data; a panic mid-push cannot leave it half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, event: Event) -> Result<(), ProtocolError> {
        let mut inner = self.lock();
        if matches!(event.kind, EventKind::UserShoot { .. })
            && !inner.pending_shoot.insert(event.session.clone())
        {
            return Err(ProtocolError::DuplicateShoot {
                session: event.session,
            });
        }
        inner.events.push_back(event);
        Ok(())
    }

    /// Take everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        let mut inner = self.lock();
        inner.pending_shoot.clear();
        inner.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
