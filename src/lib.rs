//! # hashsetd
//!
//! An in-memory digest membership server:
//! - Tens of millions of 128-bit digests held in a sorted, deduplicated array
//! - Startup integrity checks (corrupt lines and duplicates are fatal)
//! - Versioned, line-oriented TCP protocol with batch queries
//! - One isolated thread per connection
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │          (accept loop, idle watchdog, one thread/client)     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Connection                                │
//! │         LineReader ──▶ Session (handshake / V1 / V2)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ contains()
//!                       ▼
//!               ┌───────────────┐        ┌──────────────┐
//!               │   HashIndex   │◀───────│    Digest    │
//!               │ (Arc, sorted) │ encode │    Codec     │
//!               └───────────────┘        └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod digest;
pub mod index;
pub mod host;
pub mod network;
pub mod protocol;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HashsetError, Result};
pub use config::Config;
pub use digest::HashKey;
pub use index::HashIndex;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hashsetd
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
