//! Session engine
//!
//! Drives one connection from handshake to close. The V1 transaction and the
//! V2 loop are separate handlers: V1 only ever parses a QUERY, so commands
//! such as DOWNSHIFT cannot reach it.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{HashsetError, ProtocolError, Result};
use crate::host::{LoadAverage, ProcLoadAverage};
use crate::index::HashIndex;
use crate::network::ReadLine;

use super::codec::{decode_command, decode_handshake, decode_query, write_reply};
use super::{Command, Generation, Query, Reply};

/// Protocol switches taken from the server configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Refuse 2.x handshakes
    pub legacy_only: bool,

    /// Answer STATUS with size and load
    pub status_enabled: bool,

    /// Deadline for each line read
    pub line_timeout: Duration,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            legacy_only: config.legacy_only,
            status_enabled: config.status_enabled,
            line_timeout: config.line_timeout(),
        }
    }
}

/// Read-only state shared by every session
pub struct SessionContext {
    /// The loaded digest set
    pub index: Arc<HashIndex>,

    /// Protocol switches
    pub settings: SessionSettings,

    /// Host load for STATUS
    pub load: Arc<dyn LoadAverage>,
}

impl SessionContext {
    /// Context reading host load from `/proc/loadavg`
    pub fn new(index: Arc<HashIndex>, settings: SessionSettings) -> Self {
        Self::with_load_source(index, settings, Arc::new(ProcLoadAverage::new()))
    }

    pub fn with_load_source(
        index: Arc<HashIndex>,
        settings: SessionSettings,
        load: Arc<dyn LoadAverage>,
    ) -> Self {
        Self { index, settings, load }
    }
}

/// Cumulative per-session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Digests looked up
    pub queries_total: u64,

    /// Digests found in the index
    pub hits_total: u64,
}

impl SessionStats {
    /// Fraction of looked-up digests that were present
    pub fn hit_ratio(&self) -> f64 {
        if self.queries_total == 0 {
            0.0
        } else {
            self.hits_total as f64 / self.queries_total as f64
        }
    }
}

/// How a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client sent BYE
    Bye,

    /// The single V1 transaction was answered
    TransactionComplete,
}

/// Per-connection protocol state
pub struct Session {
    context: Arc<SessionContext>,

    /// Negotiated generation, `None` until the handshake succeeds
    generation: Option<Generation>,

    stats: SessionStats,
}

impl Session {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            generation: None,
            stats: SessionStats::default(),
        }
    }

    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run the session until it closes
    ///
    /// Protocol errors are answered with `NOT OK` before being returned.
    /// Network errors are returned as they occur. Either way the caller
    /// closes the connection.
    pub fn run<L: ReadLine, W: Write>(&mut self, lines: &mut L, out: &mut W) -> Result<SessionEnd> {
        let generation = self.handshake(lines, out)?;
        self.generation = Some(generation);

        match generation {
            Generation::V1 => self.run_v1(lines, out),
            Generation::V2 => self.run_v2(lines, out),
        }
    }

    fn handshake<L: ReadLine, W: Write>(&mut self, lines: &mut L, out: &mut W) -> Result<Generation> {
        let line = lines.read_line(self.context.settings.line_timeout)?;
        tracing::trace!("Handshake line: {:?}", line);

        let version = match decode_handshake(&line) {
            Ok(version) => version,
            Err(e) => return reject(out, e),
        };

        match Generation::negotiate(version, self.context.settings.legacy_only) {
            Some(generation) => {
                write_reply(out, &Reply::Ok)?;
                tracing::debug!("Negotiated protocol {} ({})", version, generation);
                Ok(generation)
            }
            None => reject(out, ProtocolError::UnsupportedVersion(version.0)),
        }
    }

    /// One QUERY, one reply, then close
    fn run_v1<L: ReadLine, W: Write>(&mut self, lines: &mut L, out: &mut W) -> Result<SessionEnd> {
        let line = lines.read_line(self.context.settings.line_timeout)?;

        let query = match decode_query(&line) {
            Ok(query) => query,
            Err(e) => return reject(out, e),
        };

        let reply = self.answer(&query);
        write_reply(out, &reply)?;
        Ok(SessionEnd::TransactionComplete)
    }

    /// Persistent command loop
    fn run_v2<L: ReadLine, W: Write>(&mut self, lines: &mut L, out: &mut W) -> Result<SessionEnd> {
        loop {
            let line = lines.read_line(self.context.settings.line_timeout)?;

            let command = match decode_command(&line) {
                Ok(command) => command,
                Err(e) => return reject(out, e),
            };
            tracing::trace!("V2 command: {}", command.keyword());

            match command {
                Command::Bye => return Ok(SessionEnd::Bye),
                Command::Downshift => {
                    write_reply(out, &Reply::Ok)?;
                    self.generation = Some(Generation::V1);
                    return self.run_v1(lines, out);
                }
                Command::Upshift => write_reply(out, &Reply::NotOk)?,
                Command::Status => write_reply(out, &self.status_reply())?,
                Command::Query(query) => {
                    let reply = self.answer(&query);
                    write_reply(out, &reply)?;
                }
            }
        }
    }

    /// Look up every key in request order and update the counters
    fn answer(&mut self, query: &Query) -> Reply {
        let index = &self.context.index;
        let flags: Vec<bool> = query.keys.iter().map(|key| index.contains(key)).collect();

        let hits = flags.iter().filter(|&&hit| hit).count() as u64;
        self.stats.queries_total += flags.len() as u64;
        self.stats.hits_total += hits;

        Reply::Hits(flags)
    }

    fn status_reply(&self) -> Reply {
        if !self.context.settings.status_enabled {
            return Reply::StatusUnsupported;
        }

        Reply::Status {
            hashes: self.context.index.len(),
            load: self.context.load.load_average().unwrap_or_default(),
        }
    }
}

/// Answer `NOT OK` and fail with `err`
fn reject<W: Write, T>(out: &mut W, err: ProtocolError) -> Result<T> {
    tracing::debug!("Rejecting client input: {}", err);
    write_reply(out, &Reply::NotOk)?;
    Err(HashsetError::Protocol(err))
}
