//! Session Engine Tests
//!
//! Drives sessions with scripted lines and checks replies, end states and
//! counters.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use hashsetd::error::{HashsetError, NetworkError, ProtocolError};
use hashsetd::host::{FixedLoadAverage, ProcLoadAverage};
use hashsetd::network::ReadLine;
use hashsetd::protocol::{Generation, Session, SessionContext, SessionEnd, SessionSettings};
use hashsetd::HashIndex;

const A: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
const B: &str = "BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
const C: &str = "CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC";

// =============================================================================
// Helpers
// =============================================================================

/// Hands out scripted lines; running dry looks like a timeout
struct Script {
    lines: VecDeque<String>,
    consumed: usize,
}

impl Script {
    fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            consumed: 0,
        }
    }
}

impl ReadLine for Script {
    fn read_line(&mut self, _timeout: Duration) -> Result<String, NetworkError> {
        match self.lines.pop_front() {
            Some(line) => {
                self.consumed += 1;
                Ok(line)
            }
            None => Err(NetworkError::Timeout),
        }
    }
}

struct Outcome {
    result: hashsetd::Result<SessionEnd>,
    replies: Vec<String>,
    session: Session,
    script: Script,
}

fn settings(legacy_only: bool, status_enabled: bool) -> SessionSettings {
    SessionSettings {
        legacy_only,
        status_enabled,
        line_timeout: Duration::from_secs(1),
    }
}

fn context(settings: SessionSettings) -> Arc<SessionContext> {
    let index = HashIndex::load(Cursor::new(format!("{}\n{}\n", A, C)), 4).unwrap();
    Arc::new(SessionContext::with_load_source(
        Arc::new(index),
        settings,
        Arc::new(FixedLoadAverage(Some([0.25, 0.5, 1.0]))),
    ))
}

fn run_with(settings: SessionSettings, lines: &[&str]) -> Outcome {
    let mut session = Session::new(context(settings));
    let mut script = Script::new(lines);
    let mut out = Vec::new();

    let result = session.run(&mut script, &mut out);
    let replies = String::from_utf8(out)
        .unwrap()
        .split_terminator("\r\n")
        .map(str::to_string)
        .collect();

    Outcome {
        result,
        replies,
        session,
        script,
    }
}

fn run(lines: &[&str]) -> Outcome {
    run_with(settings(false, false), lines)
}

fn assert_protocol_error(outcome: &Outcome) {
    assert!(
        matches!(outcome.result, Err(HashsetError::Protocol(_))),
        "expected protocol error, got {:?}",
        outcome.result
    );
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[test]
fn test_handshake_malformed() {
    let outcome = run(&["HELLO"]);
    assert_eq!(outcome.replies, vec!["NOT OK"]);
    assert_protocol_error(&outcome);
    assert_eq!(outcome.session.generation(), None);
}

#[test]
fn test_handshake_version_zero() {
    let outcome = run(&["VERSION: 0.0.0.0"]);
    assert_eq!(outcome.replies, vec!["NOT OK"]);
    assert!(matches!(
        outcome.result,
        Err(HashsetError::Protocol(ProtocolError::UnsupportedVersion(0)))
    ));
}

#[test]
fn test_handshake_version_too_high() {
    let outcome = run(&["VERSION: 2.0.0.1", "STATUS"]);
    assert_eq!(outcome.replies, vec!["NOT OK"]);
    assert_eq!(outcome.script.consumed, 1);
}

#[test]
fn test_handshake_legacy_only_refuses_v2() {
    let outcome = run_with(settings(true, false), &["VERSION: 2.0"]);
    assert_eq!(outcome.replies, vec!["NOT OK"]);
    assert_protocol_error(&outcome);
}

#[test]
fn test_handshake_legacy_only_accepts_v1() {
    let outcome = run_with(settings(true, false), &["VERSION: 1", &format!("QUERY {}", A)]);
    assert_eq!(outcome.replies, vec!["OK", "OK 1"]);
    assert!(matches!(outcome.result, Ok(SessionEnd::TransactionComplete)));
}

#[test]
fn test_handshake_timeout_sends_nothing() {
    let outcome = run(&[]);
    assert!(outcome.replies.is_empty());
    assert!(matches!(outcome.result, Err(HashsetError::Network(NetworkError::Timeout))));
}

// =============================================================================
// V1 Tests
// =============================================================================

#[test]
fn test_v1_single_query_then_close() {
    let query = format!("QUERY {} {}", A, B);
    let outcome = run(&["VERSION: 1.0.0.0", &query, "STATUS"]);

    assert_eq!(outcome.replies, vec!["OK", "OK 10"]);
    assert!(matches!(outcome.result, Ok(SessionEnd::TransactionComplete)));
    assert_eq!(outcome.session.generation(), Some(Generation::V1));

    // V1 never reads past its one transaction
    assert_eq!(outcome.script.consumed, 2);
    assert_eq!(outcome.session.stats().queries_total, 2);
    assert_eq!(outcome.session.stats().hits_total, 1);
}

#[test]
fn test_v1_preserves_query_order() {
    let query = format!("query {} {} {} {}", B, C.to_lowercase(), B, A);
    let outcome = run(&["VERSION: 0.9", &query]);
    assert_eq!(outcome.replies, vec!["OK", "OK 0101"]);
}

#[test]
fn test_v1_rejects_other_commands() {
    for command in ["STATUS", "BYE", "DOWNSHIFT", "UPSHIFT"] {
        let outcome = run(&["VERSION: 1.0", command]);
        assert_eq!(outcome.replies, vec!["OK", "NOT OK"], "{}", command);
        assert_protocol_error(&outcome);
    }
}

#[test]
fn test_v1_empty_query() {
    let outcome = run(&["VERSION: 1.0", "QUERY"]);
    assert_eq!(outcome.replies, vec!["OK", "NOT OK"]);
    assert!(matches!(
        outcome.result,
        Err(HashsetError::Protocol(ProtocolError::EmptyQuery))
    ));
}

#[test]
fn test_v1_invalid_digest_aborts_whole_query() {
    let query = format!("QUERY {} NOTAHASH", A);
    let outcome = run(&["VERSION: 1.0", &query]);

    assert_eq!(outcome.replies, vec!["OK", "NOT OK"]);
    assert_eq!(outcome.session.stats().queries_total, 0);
}

// =============================================================================
// V2 Tests
// =============================================================================

#[test]
fn test_v2_status_disabled_then_bye() {
    let outcome = run(&["VERSION: 2.0.0.0", "STATUS", "BYE"]);

    assert_eq!(outcome.replies, vec!["OK", "OK NOT SUPPORTED"]);
    assert!(matches!(outcome.result, Ok(SessionEnd::Bye)));
    assert_eq!(outcome.session.generation(), Some(Generation::V2));
}

#[test]
fn test_v2_status_enabled() {
    let outcome = run_with(settings(false, true), &["VERSION: 2", "STATUS", "BYE"]);
    assert_eq!(outcome.replies, vec!["OK", "OK 2 hashes, load 0.25 0.50 1.00"]);
}

#[test]
fn test_v2_status_without_load_source_reports_zero() {
    let dir = tempfile::tempdir().unwrap();
    let index = HashIndex::load(Cursor::new(format!("{}\n{}\n", A, C)), 4).unwrap();
    let context = Arc::new(SessionContext::with_load_source(
        Arc::new(index),
        settings(false, true),
        Arc::new(ProcLoadAverage::with_path(dir.path().join("loadavg"))),
    ));

    let mut session = Session::new(context);
    let mut script = Script::new(&["VERSION: 2", "STATUS", "BYE"]);
    let mut out = Vec::new();
    let result = session.run(&mut script, &mut out);

    assert!(matches!(result, Ok(SessionEnd::Bye)));
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "OK\r\nOK 2 hashes, load 0.00 0.00 0.00\r\n"
    );
}

#[test]
fn test_v2_multiple_queries_accumulate() {
    let first = format!("QUERY {} {}", A, B);
    let second = format!("QUERY {} {} {}", C, C.to_lowercase(), B);
    let outcome = run(&["VERSION: 1.5", &first, &second, "BYE"]);

    assert_eq!(outcome.replies, vec!["OK", "OK 10", "OK 110"]);
    assert_eq!(outcome.session.stats().queries_total, 5);
    assert_eq!(outcome.session.stats().hits_total, 3);
    assert!((outcome.session.stats().hit_ratio() - 0.6).abs() < 1e-9);
}

#[test]
fn test_v2_upshift_stays_in_loop() {
    let query = format!("QUERY {}", A);
    let outcome = run(&["VERSION: 2.0", "UPSHIFT", &query, "BYE"]);

    assert_eq!(outcome.replies, vec!["OK", "NOT OK", "OK 1"]);
    assert!(matches!(outcome.result, Ok(SessionEnd::Bye)));
}

#[test]
fn test_v2_downshift_runs_one_v1_transaction() {
    let query = format!("QUERY {} {}", B, A);
    let outcome = run(&["VERSION: 2.0", "DOWNSHIFT", &query, "BYE"]);

    assert_eq!(outcome.replies, vec!["OK", "OK", "OK 01"]);
    assert!(matches!(outcome.result, Ok(SessionEnd::TransactionComplete)));
    assert_eq!(outcome.session.generation(), Some(Generation::V1));
    assert_eq!(outcome.script.consumed, 3);
}

#[test]
fn test_v2_downshift_then_non_query() {
    let outcome = run(&["VERSION: 2.0", "DOWNSHIFT", "DOWNSHIFT"]);
    assert_eq!(outcome.replies, vec!["OK", "OK", "NOT OK"]);
    assert_protocol_error(&outcome);
}

#[test]
fn test_v2_empty_query_closes() {
    let outcome = run(&["VERSION: 2.0", "QUERY", "BYE"]);
    assert_eq!(outcome.replies, vec!["OK", "NOT OK"]);
    assert_eq!(outcome.script.consumed, 2);
}

#[test]
fn test_v2_invalid_digest_closes() {
    let query = format!("QUERY {}0", A);
    let outcome = run(&["VERSION: 2.0", &query, "BYE"]);
    assert_eq!(outcome.replies, vec!["OK", "NOT OK"]);
    assert!(matches!(
        outcome.result,
        Err(HashsetError::Protocol(ProtocolError::InvalidDigest(_)))
    ));
}

#[test]
fn test_v2_unknown_command_closes() {
    let outcome = run(&["VERSION: 2.0", "FROBNICATE", "BYE"]);
    assert_eq!(outcome.replies, vec!["OK", "NOT OK"]);
    assert_eq!(outcome.script.consumed, 2);
}

#[test]
fn test_v2_timeout_keeps_counters() {
    let query = format!("QUERY {}", A);
    let outcome = run(&["VERSION: 2.0", &query]);

    assert_eq!(outcome.replies, vec!["OK", "OK 1"]);
    assert!(matches!(outcome.result, Err(HashsetError::Network(NetworkError::Timeout))));
    assert_eq!(outcome.session.stats().hits_total, 1);
}
