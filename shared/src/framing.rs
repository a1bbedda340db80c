//! Sentinel framing for the TCP stream.
//!
//! Every message is `FRAME_START`, a UTF-8 JSON payload, `FRAME_END`.
//! JSON text never carries raw control bytes, so neither sentinel can appear
//! inside a payload and no byte stuffing is needed.

use thiserror::Error;

/// ASCII STX
pub const FRAME_START: u8 = 0x02;
/// ASCII ETX
pub const FRAME_END: u8 = 0x03;

pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Wrap a payload in start/end sentinels.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(FRAME_START);
    out.extend_from_slice(payload);
    out.push(FRAME_END);
    out
}

/// Incremental frame splitter.
///
/// Feed it whatever a socket read returned; it yields every frame completed
/// by those bytes. Bytes outside a frame are dropped. A start byte inside an
/// open frame discards the partial frame and opens a new one, which is how the
/// decoder resynchronises after garbage or a truncated write.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    in_frame: bool,
    overflowed: bool,
    max_len: usize,
}

impl FrameDecoder {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            in_frame: false,
            overflowed: false,
            max_len,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<Vec<u8>, FrameError>> {
        let mut frames = Vec::new();

        for &byte in bytes {
            match byte {
                FRAME_START => {
                    self.buf.clear();
                    self.in_frame = true;
                    self.overflowed = false;
                }
                FRAME_END if self.in_frame => {
                    self.in_frame = false;
                    if self.overflowed {
                        self.overflowed = false;
                        frames.push(Err(FrameError::TooLarge {
                            limit: self.max_len,
                        }));
                    } else {
                        frames.push(Ok(std::mem::take(&mut self.buf)));
                    }
                }
                _ if self.in_frame => {
                    if self.overflowed {
                        continue;
                    }
                    if self.buf.len() >= self.max_len {
                        // Keep skipping until the end sentinel, then report once.
                        self.overflowed = true;
                        self.buf.clear();
                    } else {
                        self.buf.push(byte);
                    }
                }
                _ => {}
            }
        }

        frames
    }

    /// Number of bytes buffered for the currently open frame.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}
