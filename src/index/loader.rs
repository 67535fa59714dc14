//! Dataset loader
//!
//! Reads a digest list into a sorted key vector.
//!
//! Steps:
//! 1. Reserve capacity for the expected entry count
//! 2. Validate and encode every non-blank line
//! 3. Sort ascending
//! 4. Reject the dataset if any two adjacent keys are equal
//! 5. Give back unused capacity

use std::io::BufRead;

use crate::digest::{self, HashKey};
use crate::error::LoadError;

/// Log a progress line every this many entries
pub const PROGRESS_INTERVAL: usize = 1_000_000;

/// Growth step when the initial reservation turns out too small
const MIN_GROWTH: usize = 1024;

pub(crate) fn load_keys<R: BufRead>(mut source: R, expected_entries: usize) -> Result<Vec<HashKey>, LoadError> {
    let mut keys: Vec<HashKey> = Vec::new();
    reserve(&mut keys, expected_entries)?;

    let mut raw = Vec::with_capacity(64);
    let mut line_number: u64 = 0;

    loop {
        raw.clear();
        if source.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        line_number += 1;

        while matches!(raw.last(), Some(b'\n' | b'\r')) {
            raw.pop();
        }
        if raw.is_empty() {
            continue;
        }
        raw.make_ascii_uppercase();

        if !digest::is_valid_digest(&raw) {
            let line = String::from_utf8_lossy(&raw).into_owned();
            tracing::error!("Hash file appears corrupt, loading no hashes");
            tracing::error!("Offending line {}: {}", line_number, line);
            return Err(LoadError::CorruptEntry { line_number, line });
        }

        // Valid grammar means valid ASCII
        let text = std::str::from_utf8(&raw).map_err(|_| LoadError::CorruptEntry {
            line_number,
            line: String::from_utf8_lossy(&raw).into_owned(),
        })?;
        let key = digest::encode(text).map_err(|e| LoadError::CorruptEntry { line_number, line: e.0 })?;

        if keys.len() == keys.capacity() {
            let grow = keys.len().max(MIN_GROWTH);
            reserve(&mut keys, grow)?;
        }
        keys.push(key);

        if keys.len() % PROGRESS_INTERVAL == 0 {
            tracing::info!("Loaded {} million hashes", keys.len() / PROGRESS_INTERVAL);
        }
    }

    tracing::info!("Read in {} hashes", keys.len());

    keys.sort_unstable();

    tracing::info!("Ensuring no duplicates");
    if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
        let digest = digest::decode(pair[0]);
        tracing::error!("Hash file contains duplicate {}, shutting down", digest);
        return Err(LoadError::DuplicateEntry { digest });
    }

    // Release whatever the up-front reservation overshot
    keys.shrink_to_fit();

    Ok(keys)
}

fn reserve(keys: &mut Vec<HashKey>, additional: usize) -> Result<(), LoadError> {
    keys.try_reserve(additional).map_err(|_| {
        tracing::error!("Couldn't reserve memory for {} more hashes", additional);
        LoadError::OutOfMemory { requested: additional }
    })
}
