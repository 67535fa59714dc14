//! Protocol codec
//!
//! Encoding and decoding functions for the line protocol.
//!
//! ## Wire Format
//!
//! Every message is one line terminated by CRLF. Input lines are split on
//! whitespace and upper-cased before matching.
//!
//! ### Handshake
//! ```text
//! VERSION: a[.b[.c[.d]]]      each octet 0..=254, missing octets are 0
//! ```
//!
//! ### Commands
//! ```text
//! QUERY <digest> [<digest> ...]
//! STATUS | BYE | UPSHIFT | DOWNSHIFT
//! ```
//!
//! ### Replies
//! ```text
//! OK | NOT OK | OK <bitstring> | OK NOT SUPPORTED
//! OK <count> hashes, load <l1> <l5> <l15>
//! ```

use std::io::Write;

use crate::digest;
use crate::error::{NetworkError, ProtocolError};

use super::{Command, ProtocolVersion, Query, Reply};

/// Line terminator for everything the server and client send
pub const LINE_END: &str = "\r\n";

/// Handshake keyword, including its colon
pub const VERSION_KEYWORD: &str = "VERSION:";

/// Split a line on whitespace, upper-casing every token
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_ascii_uppercase).collect()
}

// =============================================================================
// Handshake
// =============================================================================

/// Decode a `VERSION: a.b.c.d` line
pub fn decode_handshake(line: &str) -> Result<ProtocolVersion, ProtocolError> {
    let tokens = tokenize(line);

    match tokens.as_slice() {
        [keyword, version] if keyword == VERSION_KEYWORD => {
            parse_version(version).ok_or_else(|| ProtocolError::MalformedHandshake(line.to_string()))
        }
        _ => Err(ProtocolError::MalformedHandshake(line.to_string())),
    }
}

/// Parse 1 to 4 dotted octets; missing trailing octets are zero
pub fn parse_version(text: &str) -> Option<ProtocolVersion> {
    let parts: Vec<&str> = text.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return None;
    }

    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = part.parse().ok()?;
        if value > u32::from(ProtocolVersion::MAX_OCTET) {
            return None;
        }
        *slot = value as u8;
    }

    Some(ProtocolVersion::from_octets(octets))
}

/// Encode a handshake line for `version`
pub fn encode_handshake(version: ProtocolVersion) -> String {
    format!("{} {}{}", VERSION_KEYWORD, version, LINE_END)
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Decode a line that must be a QUERY
///
/// This is all a V1 session accepts.
pub fn decode_query(line: &str) -> Result<Query, ProtocolError> {
    let tokens = tokenize(line);

    match tokens.split_first() {
        Some((keyword, digests)) if keyword == "QUERY" => query_from_tokens(digests),
        _ => Err(ProtocolError::UnknownCommand(line.to_string())),
    }
}

/// Decode a V2 command line, dispatching on its first token
pub fn decode_command(line: &str) -> Result<Command, ProtocolError> {
    let tokens = tokenize(line);

    let Some((keyword, args)) = tokens.split_first() else {
        return Err(ProtocolError::UnknownCommand(line.to_string()));
    };

    match keyword.as_str() {
        "QUERY" => query_from_tokens(args).map(Command::Query),
        "STATUS" => Ok(Command::Status),
        "BYE" => Ok(Command::Bye),
        "UPSHIFT" => Ok(Command::Upshift),
        "DOWNSHIFT" => Ok(Command::Downshift),
        _ => Err(ProtocolError::UnknownCommand(line.to_string())),
    }
}

fn query_from_tokens(tokens: &[String]) -> Result<Query, ProtocolError> {
    if tokens.is_empty() {
        return Err(ProtocolError::EmptyQuery);
    }

    let keys = tokens
        .iter()
        .map(|token| digest::encode(token))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Query { keys })
}

/// Encode a command line (client side)
pub fn encode_command(command: &Command) -> String {
    let mut line = String::from(command.keyword());

    if let Command::Query(query) = command {
        for key in &query.keys {
            line.push(' ');
            line.push_str(&digest::decode(*key));
        }
    }

    line.push_str(LINE_END);
    line
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply line
pub fn encode_reply(reply: &Reply) -> String {
    let body = match reply {
        Reply::Ok => "OK".to_string(),
        Reply::NotOk => "NOT OK".to_string(),
        Reply::Hits(flags) => {
            let bits: String = flags.iter().map(|&hit| if hit { '1' } else { '0' }).collect();
            format!("OK {}", bits)
        }
        Reply::StatusUnsupported => "OK NOT SUPPORTED".to_string(),
        Reply::Status { hashes, load } => format!(
            "OK {} hashes, load {:.2} {:.2} {:.2}",
            hashes, load[0], load[1], load[2]
        ),
    };

    body + LINE_END
}

/// Decode a reply line (client side)
pub fn decode_reply(line: &str) -> Result<Reply, ProtocolError> {
    let tokens = tokenize(line);
    let unexpected = || ProtocolError::UnexpectedReply(line.to_string());

    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["OK"] => Ok(Reply::Ok),
        ["NOT", "OK"] => Ok(Reply::NotOk),
        ["OK", "NOT", "SUPPORTED"] => Ok(Reply::StatusUnsupported),
        ["OK", bits] if bits.bytes().all(|b| b == b'0' || b == b'1') => {
            Ok(Reply::hits(bits.bytes().map(|b| b == b'1')))
        }
        ["OK", count, "HASHES,", "LOAD", l1, l5, l15] => {
            let hashes: usize = count.parse().map_err(|_| unexpected())?;
            let mut load = [0.0; 3];
            for (slot, text) in load.iter_mut().zip([l1, l5, l15]) {
                *slot = text.parse::<f64>().map_err(|_| unexpected())?;
            }
            Ok(Reply::Status { hashes, load })
        }
        _ => Err(unexpected()),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a reply and flush
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<(), NetworkError> {
    write_line(writer, &encode_reply(reply))
}

/// Write a command and flush
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<(), NetworkError> {
    write_line(writer, &encode_command(command))
}

fn write_line<W: Write>(writer: &mut W, line: &str) -> Result<(), NetworkError> {
    writer.write_all(line.as_bytes()).map_err(NetworkError::from_io)?;
    writer.flush().map_err(NetworkError::from_io)
}
