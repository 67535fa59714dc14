//! Digest Module
//!
//! Conversion between the 32-character textual digest and the fixed-width
//! key stored in the index.
//!
//! ## Key Layout
//! ```text
//! "D41D8CD98F00B204E9800998ECF8427E"
//!  └────── high ──────┘└────── low ──────┘
//!   16 hex chars (u64)   16 hex chars (u64)
//! ```
//!
//! Keys order by `high`, then `low`. Input is case-insensitive; rendered
//! digests are always uppercase.

mod codec;

pub use codec::{decode, encode, is_valid_digest, HashKey, DIGEST_LEN};
