//! Error types for hashsetd
//!
//! Startup failures (`LoadError`) are fatal. Protocol and network failures
//! are confined to the connection that raised them.

use std::io;

use thiserror::Error;

/// Result type alias using HashsetError
pub type Result<T> = std::result::Result<T, HashsetError>;

/// Unified error type for hashsetd operations
#[derive(Debug, Error)]
pub enum HashsetError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    #[error("Dataset load failed: {0}")]
    Load(#[from] LoadError),

    // -------------------------------------------------------------------------
    // Per-connection Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A token that is not exactly 32 hexadecimal characters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid digest {0:?}")]
pub struct InvalidDigest(pub String);

/// Fatal conditions while building the hash index
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset source unreadable: {0}")]
    SourceUnreadable(#[from] io::Error),

    #[error("corrupt entry on line {line_number}: {line:?}")]
    CorruptEntry { line_number: u64, line: String },

    #[error("duplicate entry {digest}")]
    DuplicateEntry { digest: String },

    #[error("out of memory reserving space for {requested} entries")]
    OutOfMemory { requested: usize },
}

/// Malformed or unsupported client input; answered with `NOT OK`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed handshake: {0:?}")]
    MalformedHandshake(String),

    #[error("unsupported protocol version 0x{0:08x}")]
    UnsupportedVersion(u32),

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    #[error(transparent)]
    InvalidDigest(#[from] InvalidDigest),

    #[error("query without digests")]
    EmptyQuery,

    #[error("unexpected reply: {0:?}")]
    UnexpectedReply(String),
}

/// Socket level failures of a single connection
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("network timeout")]
    Timeout,

    #[error("connection reset: {0}")]
    ConnectionReset(#[source] io::Error),

    #[error("poll failure: {0}")]
    PollFailure(#[source] io::Error),

    #[error("line exceeds {limit} bytes")]
    BufferOverflow { limit: usize },

    #[error("peer closed the connection")]
    PeerClosed,
}

impl NetworkError {
    /// Classify a socket error from a read or a write
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => NetworkError::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => NetworkError::ConnectionReset(err),
            _ => NetworkError::PollFailure(err),
        }
    }
}
