//! KvBridge CLI
//!
//! Command-line tools for running and poking at a KvBridge remote store.
//!
//! # Commands
//!
//! - `serve` - Run the reference remote store over HTTP
//! - `get` - Fetch one resource and its token
//! - `put` - Write one resource with an explicit token
//! - `sync` - Mirror a remote store into a local JSON file

mod commands;

use clap::{Parser, Subcommand};
use kvbridge_protocol::ResourceKind;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// KvBridge command-line tools.
#[derive(Parser)]
#[command(name = "kvbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reference remote store
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "7070")]
        port: u16,

        /// Address to bind
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: IpAddr,

        /// Largest accepted request body in bytes
        #[arg(long, default_value = "1048576")]
        max_body_bytes: usize,

        /// Store stale writes instead of rejecting them
        #[arg(long)]
        advisory: bool,
    },

    /// Fetch a resource from a remote store
    Get {
        /// Resource name (catalog, orders, bank, users)
        #[arg(value_parser = commands::parse_resource)]
        resource: ResourceKind,

        /// Base URL of the remote store
        #[arg(short, long, env = "KVBRIDGE_REMOTE", default_value = "http://127.0.0.1:7070")]
        remote: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write a resource to a remote store
    Put {
        /// Resource name (catalog, orders, bank, users)
        #[arg(value_parser = commands::parse_resource)]
        resource: ResourceKind,

        /// Base URL of the remote store
        #[arg(short, long, env = "KVBRIDGE_REMOTE", default_value = "http://127.0.0.1:7070")]
        remote: String,

        /// File holding the wire body (stdin if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Change timestamp to send, in milliseconds
        #[arg(short, long)]
        token: u64,
    },

    /// Mirror a remote store into a local JSON file
    Sync {
        /// Base URL of the remote store
        #[arg(short, long, env = "KVBRIDGE_REMOTE", default_value = "http://127.0.0.1:7070")]
        remote: String,

        /// Path of the local key-value file
        #[arg(short, long)]
        store: PathBuf,

        /// Pull interval in milliseconds
        #[arg(short, long, default_value = "5000")]
        interval_ms: u64,

        /// Request timeout in milliseconds
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,

        /// Pull once and exit
        #[arg(long)]
        once: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            port,
            bind,
            max_body_bytes,
            advisory,
        } => {
            commands::serve::run(bind, port, max_body_bytes, advisory).await?;
        }
        Commands::Get {
            resource,
            remote,
            format,
        } => {
            commands::get::run(&remote, resource, &format).await?;
        }
        Commands::Put {
            resource,
            remote,
            file,
            token,
        } => {
            commands::put::run(&remote, resource, file.as_deref(), token).await?;
        }
        Commands::Sync {
            remote,
            store,
            interval_ms,
            timeout_ms,
            once,
        } => {
            let interval = Duration::from_millis(interval_ms.max(1));
            let timeout = Duration::from_millis(timeout_ms.max(1));
            commands::sync::run(&remote, &store, interval, timeout, once).await?;
        }
        Commands::Version => {
            println!("KvBridge CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Sync header: {}", kvbridge_protocol::SYNC_TS_HEADER);
        }
    }

    Ok(())
}
