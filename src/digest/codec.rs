//! Digest codec
//!
//! `encode` and `decode` are exact inverses on the set of valid digests.

use std::fmt;
use std::str::FromStr;

use crate::error::InvalidDigest;

/// Length of a textual digest in characters
pub const DIGEST_LEN: usize = 32;

const HALF_LEN: usize = DIGEST_LEN / 2;

/// Canonical 128-bit key for a digest
///
/// Field order matters: the derived `Ord` compares `high` before `low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HashKey {
    pub high: u64,
    pub low: u64,
}

impl HashKey {
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Big-endian byte form, `high` first
    pub fn to_be_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.high.to_be_bytes());
        out[8..].copy_from_slice(&self.low.to_be_bytes());
        out
    }
}

/// Check the digest grammar: exactly 32 characters from `[0-9A-Fa-f]`
pub fn is_valid_digest(text: &[u8]) -> bool {
    text.len() == DIGEST_LEN && text.iter().all(u8::is_ascii_hexdigit)
}

/// Convert a textual digest to its key
///
/// Longer hex strings (e.g. 40-character SHA-1) are rejected, never truncated.
pub fn encode(text: &str) -> Result<HashKey, InvalidDigest> {
    if !is_valid_digest(text.as_bytes()) {
        return Err(InvalidDigest(text.to_string()));
    }

    // Grammar already checked, so both halves are plain ASCII hex.
    let (high, low) = text.split_at(HALF_LEN);
    let parse = |half: &str| u64::from_str_radix(half, 16).map_err(|_| InvalidDigest(text.to_string()));

    Ok(HashKey {
        high: parse(high)?,
        low: parse(low)?,
    })
}

/// Render a key as 32 uppercase hex characters
pub fn decode(key: HashKey) -> String {
    key.to_string()
}

impl FromStr for HashKey {
    type Err = InvalidDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        encode(s)
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}{:016X}", self.high, self.low)
    }
}

