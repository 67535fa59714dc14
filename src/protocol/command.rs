//! Command definitions
//!
//! Represents handshakes and commands from clients.

use std::fmt;

use crate::digest::HashKey;

/// Packed protocol version: one octet per dotted component, big-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolVersion(pub u32);

impl ProtocolVersion {
    /// `1.0.0.0`, the highest single-shot version
    pub const V1: ProtocolVersion = ProtocolVersion(0x0100_0000);

    /// `2.0.0.0`, the highest persistent-session version
    pub const V2: ProtocolVersion = ProtocolVersion(0x0200_0000);

    /// Largest value a dotted octet may take
    pub const MAX_OCTET: u8 = 254;

    pub fn from_octets(octets: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(octets))
    }

    pub fn octets(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

/// Protocol generation selected by the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// One QUERY, then close
    V1,

    /// Persistent command loop
    V2,
}

impl Generation {
    /// Map a requested version onto a generation the server will speak
    pub fn negotiate(version: ProtocolVersion, legacy_only: bool) -> Option<Self> {
        match version {
            v if v.0 > 0 && v <= ProtocolVersion::V1 => Some(Generation::V1),
            v if v > ProtocolVersion::V1 && v <= ProtocolVersion::V2 && !legacy_only => {
                Some(Generation::V2)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::V1 => f.write_str("v1"),
            Generation::V2 => f.write_str("v2"),
        }
    }
}

/// A batch membership query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Keys in request order, never empty
    pub keys: Vec<HashKey>,
}

/// A command accepted in the persistent (V2) loop
///
/// The single-shot (V1) session only ever parses a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Batch membership query
    Query(Query),

    /// Server status
    Status,

    /// Graceful close, no reply
    Bye,

    /// Request a higher protocol version
    Upshift,

    /// Drop to a single V1 transaction
    Downshift,
}

impl Command {
    /// Wire keyword for this command
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Query(_) => "QUERY",
            Command::Status => "STATUS",
            Command::Bye => "BYE",
            Command::Upshift => "UPSHIFT",
            Command::Downshift => "DOWNSHIFT",
        }
    }
}
