//! Hash index implementation
//!
//! Sorted key array with binary-search lookups.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::digest::{self, HashKey};
use crate::error::{InvalidDigest, LoadError};

/// Sorted, duplicate-free set of digest keys
///
/// ## Concurrency:
/// - Built once by `load`, never mutated afterwards
/// - All methods take `&self`; share it as `Arc<HashIndex>`
#[derive(Debug, Clone)]
pub struct HashIndex {
    /// Strictly increasing keys
    keys: Vec<HashKey>,

    /// CRC32 over the sorted keys, logged at startup
    fingerprint: u32,
}

impl HashIndex {
    /// Build an index from a digest list stream
    ///
    /// `expected_entries` is reserved before reading so the key vector does
    /// not reallocate repeatedly on large datasets.
    pub fn load<R: std::io::BufRead>(source: R, expected_entries: usize) -> Result<Self, LoadError> {
        let keys = super::loader::load_keys(source, expected_entries)?;
        let fingerprint = fingerprint(&keys);

        let index = Self { keys, fingerprint };
        tracing::info!(
            "Index ready: {} unique hashes, {} KiB, fingerprint {:08x}",
            index.len(),
            index.heap_bytes() / 1024,
            fingerprint
        );

        Ok(index)
    }

    /// Open and load a digest list file
    pub fn open(path: &Path, expected_entries: usize) -> Result<Self, LoadError> {
        tracing::info!("Loading hashes from {}", path.display());

        let file = File::open(path).map_err(|e| {
            tracing::error!("Couldn't open hashes file {}: {}", path.display(), e);
            LoadError::SourceUnreadable(e)
        })?;

        Self::load(BufReader::new(file), expected_entries)
    }

    /// Check whether a key is in the set
    pub fn contains(&self, key: &HashKey) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    /// Check a textual digest, validating it first
    pub fn contains_digest(&self, text: &str) -> Result<bool, InvalidDigest> {
        Ok(self.contains(&digest::encode(text)?))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Bytes held by the key array, including spare capacity
    pub fn heap_bytes(&self) -> usize {
        self.keys.capacity() * std::mem::size_of::<HashKey>()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// CRC32 of the sorted dataset
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Keys in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &HashKey> {
        self.keys.iter()
    }
}

fn fingerprint(keys: &[HashKey]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for key in keys {
        hasher.update(&key.to_be_bytes());
    }
    hasher.finalize()
}
