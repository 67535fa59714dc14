//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop
//! - One thread per connection, owning its reader, writer and session
//! - Sessions share the index through `Arc`, read-only
//! - Active-session bookkeeping behind one mutex for idle shutdown

mod activity;
mod connection;
mod reader;
mod server;

pub use activity::{ActivityTracker, IdleWatchdog, SessionGuard, MIN_IDLE_CHECK};
pub use connection::{Connection, ConnectionOptions};
pub use reader::{LineReader, PollRead, ReadLine};
pub use server::{Server, ShutdownHandle};
