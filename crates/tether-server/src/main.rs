//! Tether escrow server binary.
//!
//! # Usage
//!
//! ```bash
//! # Create an exchange key and a signing key
//! tether-server keygen --keys /var/db/tether
//!
//! # Serve them
//! tether-server serve --bind 0.0.0.0:8080 --keys /var/db/tether
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tether_crypto::{Curve, ThumbprintAlgorithm};
use tether_server::{ServerConfig, ServerError, ServerProtocol, http, keys};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Tether escrow server
#[derive(Parser, Debug)]
#[command(name = "tether-server")]
#[command(about = "Network-bound key escrow server")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve advertisements and recovery requests
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// Directory of *.jwk key files
        #[arg(short, long)]
        keys: PathBuf,

        /// Thumbprint hashes keys are addressed by (S1, S224, S256, S384,
        /// S512)
        #[arg(long, value_delimiter = ',')]
        thumbprints: Vec<ThumbprintAlgorithm>,
    },

    /// Generate an exchange key and a signing key
    Keygen {
        /// Directory to write the key files into
        #[arg(short, long)]
        keys: PathBuf,

        /// Curve of both keys (P-256, P-384, P-521)
        #[arg(short, long, default_value = "P-521")]
        curve: Curve,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match args.command {
        Command::Serve { bind, keys: dir, thumbprints } => {
            let mut config = ServerConfig::default();
            if !thumbprints.is_empty() {
                config = config.with_thumbprint_algorithms(thumbprints);
            }

            let keys = keys::load(&dir)?;
            let protocol = Arc::new(ServerProtocol::with_config(keys, config)?);

            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .map_err(|err| ServerError::Config(format!("cannot bind {bind}: {err}")))?;

            http::serve(listener, protocol).await?;
        },
        Command::Keygen { keys: dir, curve } => {
            let written = keys::generate(&dir, curve)?;
            tracing::info!(count = written.len(), dir = %dir.display(), "keys written");
        },
    }

    Ok(())
}
