//! Example client and server for key-based TLS.
//!
//! The server generates a connection key when none is given and prints it;
//! paste that key into the client invocation on the other machine.

use clap::{Parser, Subcommand};
use kbtls::{ConnectionKey, TlsListener};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MESSAGE: &[u8] = b"hello";

#[derive(Parser)]
#[command(name = "kbtls-demo")]
#[command(version, about = "Pinned mutual TLS from a single shared connection key")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server; generates and prints a connection key when none is given
    Server {
        /// Connection key to authenticate with
        key: Option<String>,

        #[arg(short, long, default_value = "localhost:8443", help = "Address to listen on")]
        addr: String,
    },

    /// Connect to the server with the given connection key
    Client {
        /// Connection key shared by the server
        key: String,

        #[arg(short, long, default_value = "localhost:8443", help = "Address to connect to")]
        addr: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Server { key, addr } => {
            let key = match key {
                Some(text) => {
                    ConnectionKey::parse(&text)?;
                    text
                }
                None => {
                    let key = ConnectionKey::generate()?;
                    println!("Connection key: {key}");
                    key.to_string()
                }
            };

            let listener = kbtls::listen(addr.as_str(), &key).await?;
            info!("listening on {}", listener.local_addr()?);

            serve(listener).await
        }
        Commands::Client { key, addr } => {
            let mut stream = kbtls::dial(addr.as_str(), &key).await?;

            let mut buf = vec![0u8; MESSAGE.len()];
            stream.read_exact(&mut buf).await?;

            info!(
                "TLS connection with {} established, received message: {}",
                stream.get_ref().0.peer_addr()?,
                String::from_utf8_lossy(&buf)
            );

            stream.shutdown().await?;

            Ok(())
        }
    }
}

async fn serve(listener: TlsListener) -> anyhow::Result<()> {
    loop {
        match listener.accept().await {
            Ok((mut stream, peer)) => {
                info!("TLS connection with {peer} established, sending message");

                if let Err(e) = stream.write_all(MESSAGE).await {
                    warn!("write to {peer}: {e}");
                }

                if let Err(e) = stream.shutdown().await {
                    warn!("close connection with {peer}: {e}");
                }
            }
            // a failed handshake only affects that one peer
            Err(e) => warn!("accept: {e}"),
        }
    }
}
