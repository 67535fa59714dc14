//! Index Module
//!
//! Immutable, sorted, deduplicated set of digest keys.
//!
//! ## Responsibilities
//! - Build the set once at startup from a plain-text digest list
//! - Reject the whole dataset on any corrupt or duplicate line
//! - Answer membership queries with a binary search
//!
//! ## Data Structure Choice
//! A flat `Vec<HashKey>` (16 bytes per entry, no per-node overhead):
//! - ~40M entries fit in ~640 MB
//! - Binary search over contiguous memory is cache friendly
//! - Never mutated after `load`, so it is shared through `Arc` without a lock

mod loader;
mod table;

pub use loader::PROGRESS_INTERVAL;
pub use table::HashIndex;
