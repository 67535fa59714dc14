//! Protocol Module
//!
//! Defines the line protocol and the per-connection session engine.
//!
//! ## Session States
//! ```text
//!                    ┌──────────────┐  OK   ┌──────────────┐
//!   VERSION: 1.x ───▶│              │──────▶│  V1 session  │──▶ closed
//!                    │ AwaitingHand │       └──────────────┘
//!                    │    shake     │               ▲ DOWNSHIFT
//!   VERSION: 2.x ───▶│              │──────▶┌───────┴──────┐
//!                    └──────────────┘  OK   │   V2 loop    │──▶ closed (BYE)
//!                                           └──────────────┘
//! ```
//!
//! ### Handshake
//! - `(0, 1.0.0.0]`: single-shot V1
//! - `(1.0.0.0, 2.0.0.0]`: persistent V2 (unless legacy-only)
//! - anything else: `NOT OK`, close
//!
//! ### Commands (V2)
//! - QUERY: `OK <bitstring>`
//! - STATUS: `OK NOT SUPPORTED` or index size and host load
//! - BYE: close, no reply
//! - UPSHIFT: `NOT OK`, stay in V2
//! - DOWNSHIFT: `OK`, then one V1 transaction
//!
//! Any malformed input is answered with `NOT OK` and the connection closes.

mod codec;
mod command;
mod response;
mod session;

pub use codec::{
    decode_command, decode_handshake, decode_query, decode_reply, encode_command, encode_handshake,
    encode_reply, parse_version, tokenize, write_command, write_reply, LINE_END, VERSION_KEYWORD,
};
pub use command::{Command, Generation, ProtocolVersion, Query};
pub use response::Reply;
pub use session::{Session, SessionContext, SessionEnd, SessionSettings, SessionStats};
