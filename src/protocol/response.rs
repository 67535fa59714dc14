//! Reply definitions
//!
//! Represents replies to clients.

use crate::host::LoadFigures;

/// A reply line sent to the client
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `OK`
    Ok,

    /// `NOT OK`
    NotOk,

    /// `OK <bitstring>`, one flag per queried digest
    Hits(Vec<bool>),

    /// `OK NOT SUPPORTED`
    StatusUnsupported,

    /// `OK <count> hashes, load <l1> <l5> <l15>`
    Status { hashes: usize, load: LoadFigures },
}

impl Reply {
    /// Build a hit reply from per-key lookups
    pub fn hits(flags: impl IntoIterator<Item = bool>) -> Self {
        Reply::Hits(flags.into_iter().collect())
    }

    /// Whether this reply signals acceptance
    pub fn is_ok(&self) -> bool {
        !matches!(self, Reply::NotOk)
    }
}
