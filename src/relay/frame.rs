//! Newline-delimited frame forwarding for one relay direction.
//!
//! A frame is every byte up to and including the first `\n`. A partial frame
//! left when the source reaches end-of-stream is forwarded unchanged. Each
//! frame is flushed before the next read so nothing waits on a frame boundary.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::observability::Stats;
use crate::relay::error::ConnectionError;

/// Initial frame buffer size; ServerQuery lines are usually far shorter.
const FRAME_BUFFER_CAPACITY: usize = 1024;

/// One of the two forwarding flows of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    /// Only client frames are commands; backend frames are responses.
    pub fn counts_commands(self) -> bool {
        matches!(self, Direction::ClientToBackend)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToBackend => write!(f, "client→backend"),
            Direction::BackendToClient => write!(f, "backend→client"),
        }
    }
}

/// Counters owned by a single session and shared by its two directions.
#[derive(Debug, Default)]
pub struct SessionCounters {
    commands: AtomicU64,
    bytes: AtomicU64,
}

impl SessionCounters {
    fn record(&self, direction: Direction, len: u64) {
        self.bytes.fetch_add(len, Ordering::Relaxed);
        if direction.counts_commands() {
            self.commands.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn commands(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Forward frames from `reader` to `writer` until end-of-stream or an I/O error.
///
/// Clean end-of-stream returns `Ok(())`. Counters are updated only after a
/// frame has been written and flushed.
///
/// Frame length is not capped: a peer that never sends `\n` is buffered until
/// it does or closes. The buffer is shrunk back after an oversized frame.
pub async fn relay_frames<R, W>(
    mut reader: R,
    mut writer: W,
    direction: Direction,
    session: Arc<SessionCounters>,
    stats: Arc<Stats>,
) -> Result<(), ConnectionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frame = Vec::with_capacity(FRAME_BUFFER_CAPACITY);

    loop {
        reset_frame(&mut frame);
        let n = reader
            .read_until(b'\n', &mut frame)
            .await
            .map_err(|source| ConnectionError::Read { direction, source })?;
        if n == 0 {
            return Ok(());
        }

        writer
            .write_all(&frame)
            .await
            .map_err(|source| ConnectionError::Write { direction, source })?;
        writer
            .flush()
            .await
            .map_err(|source| ConnectionError::Write { direction, source })?;

        let len = n as u64;
        session.record(direction, len);
        stats.add_bytes(len);
        if direction.counts_commands() {
            stats.add_command();
        }
    }
}

fn reset_frame(frame: &mut Vec<u8>) {
    frame.clear();
    if frame.capacity() > FRAME_BUFFER_CAPACITY {
        frame.shrink_to(FRAME_BUFFER_CAPACITY);
    }
}
