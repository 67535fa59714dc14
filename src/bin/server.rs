//! hashsetd Server Binary
//!
//! Loads the digest list, then starts the TCP server.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hashsetd::network::Server;
use hashsetd::{Config, HashIndex};
use tracing_subscriber::{fmt, EnvFilter};

/// hashsetd Server
#[derive(Parser, Debug)]
#[command(name = "hashsetd-server")]
#[command(about = "Serves membership queries against a set of MD5 digests")]
#[command(version)]
struct Args {
    /// Digest list to serve, one 32-hex digest per line
    #[arg(short, long, value_name = "FILE", default_value = "./hashes.txt")]
    #[arg(value_parser = existing_file)]
    file: String,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT", default_value_t = 9120)]
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Only accept protocol 1.x clients
    #[arg(short = 'o', long)]
    legacy_only: bool,

    /// Answer STATUS with index size and host load
    #[arg(short, long)]
    status: bool,

    /// Exit after this many seconds without any client
    #[arg(short = 't', long, value_name = "SECONDS")]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    idle_shutdown: Option<u64>,

    /// Seconds a client has to finish each line
    #[arg(long, value_name = "SECONDS", default_value_t = 15)]
    line_timeout: u64,

    /// Capacity reserved for the index up front
    #[arg(long, default_value_t = 40_000_000)]
    expected_entries: usize,
}

/// Sanity check only; the file is opened again when loading
fn existing_file(s: &str) -> Result<String, String> {
    let path = Path::new(s);
    if path.is_file() {
        Ok(s.to_string())
    } else {
        Err(format!("{} not found", s))
    }
}

fn main() {
    let args = Args::parse();

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hashsetd=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("hashsetd Server v{}", hashsetd::VERSION);
    tracing::info!("Dataset: {}", args.file);

    // Build config from args
    let config = Config::builder()
        .dataset_path(&args.file)
        .listen_addr(format!("{}:{}", args.bind, args.port))
        .legacy_only(args.legacy_only)
        .status_enabled(args.status)
        .idle_shutdown(args.idle_shutdown.map(Duration::from_secs))
        .line_timeout_ms(args.line_timeout.saturating_mul(1000))
        .expected_entries(args.expected_entries)
        .build();

    // The dataset must load completely before any socket is opened
    let index = match HashIndex::open(&config.dataset_path, config.expected_entries) {
        Ok(index) => Arc::new(index),
        Err(e) => {
            tracing::error!("Failed to load hashes: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, index) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
