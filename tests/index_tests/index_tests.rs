//! Hash Index Tests
//!
//! Tests verify:
//! - Membership for present and absent digests
//! - Blank line and CRLF handling
//! - Fatal corrupt and duplicate entries
//! - Loading from a file
//! - Concurrent read-only lookups

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::thread;

use hashsetd::digest::{encode, HashKey};
use hashsetd::error::LoadError;
use hashsetd::HashIndex;
use tempfile::NamedTempFile;

const A: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
const B: &str = "BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

fn load(text: &str) -> Result<HashIndex, LoadError> {
    HashIndex::load(Cursor::new(text.as_bytes().to_vec()), 16)
}

/// Deterministic set of distinct keys
fn sample_keys(count: u64) -> Vec<HashKey> {
    (0..count)
        .map(|i| HashKey::new(i.wrapping_mul(0x9E3779B97F4A7C15), i))
        .collect()
}

fn dataset(keys: &[HashKey]) -> String {
    keys.iter().map(|k| format!("{}\n", k)).collect()
}

// =============================================================================
// Membership Tests
// =============================================================================

#[test]
fn test_contains_present_and_absent() {
    let index = load(&format!("{}\n{}\n", A, EMPTY_MD5)).unwrap();

    assert_eq!(index.len(), 2);
    assert!(index.contains(&encode(A).unwrap()));
    assert!(index.contains(&encode(EMPTY_MD5).unwrap()));
    assert!(!index.contains(&encode(B).unwrap()));
}

#[test]
fn test_contains_every_loaded_key() {
    let keys = sample_keys(5_000);
    let index = load(&dataset(&keys)).unwrap();

    assert_eq!(index.len(), keys.len());
    for key in &keys {
        assert!(index.contains(key), "missing {}", key);
    }
    assert!(!index.contains(&HashKey::new(1, 0)));
}

#[test]
fn test_contains_digest_validates() {
    let index = load(&format!("{}\n", A)).unwrap();

    assert!(index.contains_digest(&A.to_lowercase()).unwrap());
    assert!(!index.contains_digest(B).unwrap());
    assert!(index.contains_digest("short").is_err());
}

#[test]
fn test_keys_are_sorted() {
    let keys = sample_keys(1_000);
    let index = load(&dataset(&keys)).unwrap();

    let loaded: Vec<HashKey> = index.iter().copied().collect();
    assert!(loaded.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_lowercase_input_is_normalized() {
    let index = load(&format!("{}\n", EMPTY_MD5)).unwrap();
    assert!(index.contains_digest(&EMPTY_MD5.to_uppercase()).unwrap());
}

// =============================================================================
// Line Handling Tests
// =============================================================================

#[test]
fn test_blank_lines_are_skipped() {
    let index = load(&format!("\n{}\n\n\r\n{}\n\n", A, B)).unwrap();
    assert_eq!(index.len(), 2);
}

#[test]
fn test_crlf_line_endings() {
    let index = load(&format!("{}\r\n{}\r\n", A, B)).unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.contains_digest(B).unwrap());
}

#[test]
fn test_last_line_without_newline() {
    let index = load(&format!("{}\n{}", A, B)).unwrap();
    assert_eq!(index.len(), 2);
}

#[test]
fn test_empty_source() {
    let index = load("").unwrap();
    assert!(index.is_empty());
    assert!(!index.contains(&HashKey::new(0, 0)));
}

// =============================================================================
// Fatal Condition Tests
// =============================================================================

#[test]
fn test_corrupt_line_is_fatal() {
    let err = load(&format!("{}\nnot a hash\n{}\n", A, B)).unwrap_err();

    match err {
        LoadError::CorruptEntry { line_number, line } => {
            assert_eq!(line_number, 2);
            assert_eq!(line, "NOT A HASH");
        }
        other => panic!("Expected CorruptEntry, got {:?}", other),
    }
}

#[test]
fn test_sha1_line_is_fatal() {
    let err = load("da39a3ee5e6b4b0d3255bfef95601890afd80709\n").unwrap_err();
    assert!(matches!(err, LoadError::CorruptEntry { line_number: 1, .. }));
}

#[test]
fn test_whitespace_only_line_is_fatal() {
    let err = load(&format!("{}\n   \n", A)).unwrap_err();
    assert!(matches!(err, LoadError::CorruptEntry { line_number: 2, .. }));
}

#[test]
fn test_trailing_space_is_fatal() {
    let err = load(&format!("{} \n", A)).unwrap_err();
    assert!(matches!(err, LoadError::CorruptEntry { .. }));
}

#[test]
fn test_invalid_utf8_is_fatal() {
    let mut bytes = format!("{}\n", A).into_bytes();
    bytes.extend_from_slice(&[0xFF; 32]);
    bytes.push(b'\n');

    let err = HashIndex::load(Cursor::new(bytes), 4).unwrap_err();
    assert!(matches!(err, LoadError::CorruptEntry { line_number: 2, .. }));
}

#[test]
fn test_duplicate_is_fatal() {
    let err = load(&format!("{}\n{}\n{}\n", A, B, A)).unwrap_err();

    match err {
        LoadError::DuplicateEntry { digest } => assert_eq!(digest, A),
        other => panic!("Expected DuplicateEntry, got {:?}", other),
    }
}

#[test]
fn test_duplicate_after_case_normalization_is_fatal() {
    let err = load(&format!("{}\n{}\n", EMPTY_MD5, EMPTY_MD5.to_uppercase())).unwrap_err();
    assert!(matches!(err, LoadError::DuplicateEntry { .. }));
}

#[test]
fn test_oversized_reservation_is_out_of_memory() {
    let err = HashIndex::load(Cursor::new(Vec::new()), usize::MAX).unwrap_err();
    assert!(matches!(err, LoadError::OutOfMemory { .. }));
}

#[test]
fn test_small_reservation_still_grows() {
    let keys = sample_keys(3_000);
    let index = HashIndex::load(Cursor::new(dataset(&keys).into_bytes()), 1).unwrap();
    assert_eq!(index.len(), 3_000);
}

#[test]
fn test_unused_reservation_is_released() {
    let index = HashIndex::load(Cursor::new(format!("{}\n{}\n", A, B)), 1_000_000).unwrap();
    assert_eq!(index.len(), 2);

    // A million 16-byte keys were reserved; only the two loaded remain
    assert!(index.heap_bytes() < 1024, "heap_bytes = {}", index.heap_bytes());
}

// =============================================================================
// File Loading Tests
// =============================================================================

#[test]
fn test_open_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", A).unwrap();
    writeln!(file, "{}", EMPTY_MD5).unwrap();
    file.flush().unwrap();

    let index = HashIndex::open(file.path(), 8).unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.contains_digest(EMPTY_MD5).unwrap());
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = HashIndex::open(&dir.path().join("missing.txt"), 8).unwrap_err();
    assert!(matches!(err, LoadError::SourceUnreadable(_)));
}

// =============================================================================
// Fingerprint Tests
// =============================================================================

#[test]
fn test_fingerprint_ignores_input_order() {
    let first = load(&format!("{}\n{}\n", A, B)).unwrap();
    let second = load(&format!("{}\n{}\n", B, A.to_lowercase())).unwrap();
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn test_fingerprint_differs_for_different_sets() {
    let first = load(&format!("{}\n", A)).unwrap();
    let second = load(&format!("{}\n", B)).unwrap();
    assert_ne!(first.fingerprint(), second.fingerprint());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_lookups() {
    let keys = sample_keys(2_000);
    let index = Arc::new(load(&dataset(&keys)).unwrap());
    let keys = Arc::new(keys);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let index = Arc::clone(&index);
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                keys.iter()
                    .skip(t)
                    .step_by(8)
                    .all(|key| index.contains(key))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
