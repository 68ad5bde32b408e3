//! Minimal file-transfer demo over the secure channel: a server that
//! receives one file per connection, and a client that sends one.

use anyhow::{Context, Result};
use channel_core::{read_stream, write_stream, Compress, Endpoint, EndpointConfig, Role};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressArg {
    Opportunistic,
    Always,
    Never,
}

impl From<CompressArg> for Compress {
    fn from(c: CompressArg) -> Self {
        match c {
            CompressArg::Opportunistic => Compress::Opportunistic,
            CompressArg::Always => Compress::Always,
            CompressArg::Never => Compress::Never,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Secure length-framed channel file transfer demo", long_about = None)]
struct Args {
    /// Operating mode: server (receiver) or client (sender)
    #[arg(long, value_enum)]
    mode: Mode,

    /// Host to bind (server) or connect to (client)
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port number
    #[arg(long, default_value_t = 9443)]
    port: u16,

    /// Client: file to send. Server: path to write the received file to.
    #[arg(long)]
    file: PathBuf,

    #[arg(long, default_value_t = channel_core::DEFAULT_MAX_PACKAGE_SIZE)]
    max_package_size: u32,

    /// Bit length of the client's ephemeral RSA handshake key
    #[arg(long, default_value_t = channel_core::DEFAULT_RSA_KEY_SIZE)]
    rsa_key_size: usize,

    #[arg(long, value_enum, default_value = "opportunistic")]
    compress: CompressArg,
}

async fn run_server(args: &Args) -> Result<()> {
    let addr = format!("{}:{}", args.host, args.port);
    info!(%addr, "listening");
    let listener = TcpListener::bind(&addr).await.context("bind failed")?;
    let (stream, peer) = listener.accept().await.context("accept failed")?;
    info!(%peer, "accepted connection");

    let config = EndpointConfig::builder(Role::Server)
        .max_package_size(args.max_package_size)
        .rsa_key_size(args.rsa_key_size)
        .compress(args.compress.into())
        .build()?;
    let mut endpoint = Endpoint::new(stream, config);

    let mut out = File::create(&args.file)
        .await
        .with_context(|| format!("failed to create {}", args.file.display()))?;
    let total = read_stream(&mut endpoint, &mut out).await?;
    info!(total, path = %args.file.display(), "file received");
    Ok(())
}

async fn run_client(args: &Args) -> Result<()> {
    let addr = format!("{}:{}", args.host, args.port);
    info!(%addr, "connecting");
    let stream = TcpStream::connect(&addr).await.context("connect failed")?;

    let config = EndpointConfig::builder(Role::Client)
        .max_package_size(args.max_package_size)
        .rsa_key_size(args.rsa_key_size)
        .compress(args.compress.into())
        .build()?;
    let mut endpoint = Endpoint::new(stream, config);

    let mut input = File::open(&args.file)
        .await
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let total = write_stream(&mut endpoint, &mut input, None, None).await?;
    info!(total, path = %args.file.display(), "file sent");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match args.mode {
        Mode::Server => run_server(&args).await,
        Mode::Client => run_client(&args).await,
    }
}
