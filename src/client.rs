//! Blocking client for the hashsetd protocol

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::digest::HashKey;
use crate::error::{HashsetError, NetworkError, ProtocolError, Result};
use crate::protocol::{
    decode_reply, encode_handshake, write_command, Command, Generation, ProtocolVersion, Query, Reply,
};

/// A connected, handshaken client
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    generation: Generation,
}

impl Client {
    /// Connect and negotiate `version`
    pub fn connect<A: ToSocketAddrs>(addr: A, version: ProtocolVersion) -> Result<Self> {
        let generation = Generation::negotiate(version, false)
            .ok_or(HashsetError::Protocol(ProtocolError::UnsupportedVersion(version.0)))?;

        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        let mut client = Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
            generation,
        };

        client.send_line(&encode_handshake(version))?;
        match client.read_reply()? {
            Reply::Ok => Ok(client),
            _ => Err(ProtocolError::UnsupportedVersion(version.0).into()),
        }
    }

    /// Set a read timeout for replies
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Query membership; one flag per key, in order
    ///
    /// A V1 connection is closed by the server after this call.
    pub fn query(&mut self, keys: &[HashKey]) -> Result<Vec<bool>> {
        if keys.is_empty() {
            return Err(ProtocolError::EmptyQuery.into());
        }

        let command = Command::Query(Query { keys: keys.to_vec() });
        write_command(&mut self.writer, &command)?;

        match self.read_reply()? {
            Reply::Hits(flags) if flags.len() == keys.len() => Ok(flags),
            other => Err(unexpected(&other)),
        }
    }

    /// Raw STATUS reply
    pub fn status(&mut self) -> Result<Reply> {
        write_command(&mut self.writer, &Command::Status)?;
        self.read_reply()
    }

    /// Request an upshift; `true` if the server accepted
    pub fn upshift(&mut self) -> Result<bool> {
        write_command(&mut self.writer, &Command::Upshift)?;
        Ok(self.read_reply()?.is_ok())
    }

    /// Drop to a single V1 transaction
    pub fn downshift(&mut self) -> Result<()> {
        write_command(&mut self.writer, &Command::Downshift)?;
        match self.read_reply()? {
            Reply::Ok => {
                self.generation = Generation::V1;
                Ok(())
            }
            other => Err(unexpected(&other)),
        }
    }

    /// Close gracefully
    pub fn bye(mut self) -> Result<()> {
        write_command(&mut self.writer, &Command::Bye)?;
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_reply(&mut self) -> Result<Reply> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).map_err(NetworkError::from_io)? == 0 {
            return Err(NetworkError::PeerClosed.into());
        }
        Ok(decode_reply(line.trim_end())?)
    }
}

fn unexpected(reply: &Reply) -> HashsetError {
    ProtocolError::UnexpectedReply(crate::protocol::encode_reply(reply).trim_end().to_string()).into()
}
