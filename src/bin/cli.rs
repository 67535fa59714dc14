//! hashsetd CLI Client
//!
//! Command-line interface for querying a hashsetd server.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hashsetd::protocol::{parse_version, Reply};
use hashsetd::{Client, HashKey};

/// hashsetd CLI
#[derive(Parser, Debug)]
#[command(name = "hashsetd-cli")]
#[command(about = "CLI for the hashsetd digest server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9120")]
    server: String,

    /// Protocol version to negotiate
    #[arg(long, default_value = "2.0")]
    protocol: String,

    /// Reply timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether digests are known to the server
    Query {
        /// 32-character hex digests
        #[arg(required = true)]
        digests: Vec<String>,
    },

    /// Show server status
    Status,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> hashsetd::Result<()> {
    let version = parse_version(&args.protocol)
        .ok_or_else(|| hashsetd::HashsetError::Config(format!("bad protocol version {:?}", args.protocol)))?;

    let mut client = Client::connect(&args.server, version)?;
    client.set_timeout(Some(Duration::from_secs(args.timeout)))?;

    match args.command {
        Commands::Query { digests } => {
            let keys = digests
                .iter()
                .map(|d| d.parse::<HashKey>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(hashsetd::error::ProtocolError::from)?;

            let flags = client.query(&keys)?;
            for (key, hit) in keys.iter().zip(flags) {
                println!("{} {}", key, if hit { 1 } else { 0 });
            }
        }
        Commands::Status => match client.status()? {
            Reply::Status { hashes, load } => {
                println!("{} hashes, load {:.2} {:.2} {:.2}", hashes, load[0], load[1], load[2]);
            }
            Reply::StatusUnsupported => println!("status not supported"),
            other => println!("{:?}", other),
        },
    }

    if client.generation() == hashsetd::protocol::Generation::V2 {
        client.bye()?;
    }

    Ok(())
}
