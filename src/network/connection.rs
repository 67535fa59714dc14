//! Connection Handler
//!
//! Runs one session over one client socket.

use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{HashsetError, Result};
use crate::protocol::{Generation, Session, SessionContext, SessionEnd, SessionStats};

use super::LineReader;

/// Socket settings applied to every accepted connection
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    /// Readiness wait granularity
    pub poll_interval: Duration,

    /// Buffered input ceiling
    pub max_line_bytes: usize,

    /// Write timeout, zero disables it
    pub write_timeout: Duration,
}

impl From<&Config> for ConnectionOptions {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_line_bytes: config.max_line_bytes,
            write_timeout: config.write_timeout(),
        }
    }
}

/// Result of a finished connection, as logged
#[derive(Debug)]
struct ConnectionSummary {
    peer_addr: String,
    generation: Option<Generation>,
    stats: SessionStats,

    /// `false` for timeouts, socket errors and protocol violations
    normal: bool,
}

/// Handles a single client connection
pub struct Connection {
    /// Line reader over the read half
    reader: LineReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Protocol state for this client only
    session: Session,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up the line reader and buffered writer and configures timeouts
    pub fn new(stream: TcpStream, context: Arc<SessionContext>, options: ConnectionOptions) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        if !options.write_timeout.is_zero() {
            stream.set_write_timeout(Some(options.write_timeout))?;
        }

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: LineReader::new(read_stream, options.poll_interval, options.max_line_bytes),
            writer: BufWriter::new(write_stream),
            session: Session::new(context),
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Every failure ends here: it is logged with the session counters and
    /// the socket is closed.
    pub fn handle(mut self) {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let outcome = self.session.run(&mut self.reader, &mut self.writer);
        let stats = self.session.stats();
        let generation = self.session.generation();

        let normal = match &outcome {
            Ok(SessionEnd::Bye) => {
                tracing::debug!("Client {} said BYE", self.peer_addr);
                true
            }
            Ok(SessionEnd::TransactionComplete) => true,
            Err(HashsetError::Protocol(e)) => {
                tracing::debug!("Protocol violation from {}: {}", self.peer_addr, e);
                false
            }
            Err(e) => {
                tracing::debug!("Connection to {} failed: {}", self.peer_addr, e);
                false
            }
        };

        log_summary(&ConnectionSummary {
            peer_addr: self.peer_addr,
            generation,
            stats,
            normal,
        });

        // The peer may already be gone
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

fn log_summary(summary: &ConnectionSummary) {
    let generation = summary
        .generation
        .map(|g| g.to_string())
        .unwrap_or_else(|| "none".to_string());

    if summary.normal {
        tracing::info!(
            "Closed {} normally: protocol {}, {} queries, {} hits ({:.1}%)",
            summary.peer_addr,
            generation,
            summary.stats.queries_total,
            summary.stats.hits_total,
            summary.stats.hit_ratio() * 100.0
        );
    } else {
        tracing::warn!(
            "Closed {} abnormally: protocol {}, {} queries, {} hits ({:.1}%)",
            summary.peer_addr,
            generation,
            summary.stats.queries_total,
            summary.stats.hits_total,
            summary.stats.hit_ratio() * 100.0
        );
    }
}
