//! Line Reader
//!
//! Accumulates raw socket bytes into newline-terminated commands.
//!
//! ## Behaviour
//! - A complete line already buffered is returned without touching the socket
//! - Otherwise the socket is waited on in slices of `poll_interval` until the
//!   per-call deadline passes
//! - Buffered input without a newline may not grow past `max_line_bytes`
//!
//! Every connection owns its own reader; the accumulator is never shared.

use std::io::{self, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};

use crate::error::NetworkError;

/// Bytes requested from the socket per read
const READ_CHUNK: usize = 8192;

/// Shortest wait handed to the socket; a zero timeout is rejected by the OS
const MIN_WAIT: Duration = Duration::from_millis(1);

/// A byte stream whose reads can be bounded in time
///
/// A read that waits `wait` without data must fail with `WouldBlock` or
/// `TimedOut`.
pub trait PollRead: Read {
    fn set_wait(&mut self, wait: Duration) -> io::Result<()>;
}

impl PollRead for TcpStream {
    fn set_wait(&mut self, wait: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(wait))
    }
}

/// Source of protocol lines
pub trait ReadLine {
    /// Next line without its terminator, waiting at most `timeout`
    fn read_line(&mut self, timeout: Duration) -> Result<String, NetworkError>;
}

/// Per-connection line reader
pub struct LineReader<S> {
    /// Underlying stream
    stream: S,

    /// Bytes received but not yet returned as a line
    buffer: BytesMut,

    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,

    /// Readiness wait granularity
    poll_interval: Duration,

    /// Ceiling on `buffer` while no newline is present
    max_line_bytes: usize,
}

impl<S: PollRead> LineReader<S> {
    pub fn new(stream: S, poll_interval: Duration, max_line_bytes: usize) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            scanned: 0,
            poll_interval: poll_interval.max(MIN_WAIT),
            max_line_bytes,
        }
    }

    /// Bytes buffered but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Split the first complete line off the accumulator
    fn take_line(&mut self) -> Option<String> {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };
        let newline = self.scanned + offset;

        let mut line = self.buffer.split_to(newline);
        self.buffer.advance(1);
        self.scanned = 0;

        while line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl<S: PollRead> ReadLine for LineReader<S> {
    fn read_line(&mut self, timeout: Duration) -> Result<String, NetworkError> {
        if let Some(line) = self.take_line() {
            return Ok(line);
        }

        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(NetworkError::Timeout);
            }

            let wait = self.poll_interval.min(deadline - now).max(MIN_WAIT);
            self.stream.set_wait(wait).map_err(NetworkError::PollFailure)?;

            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(NetworkError::PeerClosed),
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);

                    if let Some(line) = self.take_line() {
                        return Ok(line);
                    }
                    if self.buffer.len() > self.max_line_bytes {
                        tracing::warn!("Line buffer too large: {} bytes", self.buffer.len());
                        return Err(NetworkError::BufferOverflow {
                            limit: self.max_line_bytes,
                        });
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => match NetworkError::from_io(e) {
                    // Slice elapsed without data; keep waiting until the deadline
                    NetworkError::Timeout => continue,
                    other => return Err(other),
                },
            }
        }
    }
}
