use std::path::PathBuf;

use clap::{Args, Subcommand};
use jotwire_server::DEFAULT_PORT;
use jotwire_transport::DEFAULT_READ_CHUNK_SIZE;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a headless application server.
    Serve(ServeArgs),
    /// Send a single frame.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Loopback port to listen on (0 picks a free port).
    #[arg(long, env = "JOTWIRE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Bytes requested per socket read.
    #[arg(long, default_value_t = DEFAULT_READ_CHUNK_SIZE)]
    pub read_chunk_size: usize,
    /// Keep reading after a zero-length read instead of treating it as disconnect.
    #[arg(long)]
    pub retry_empty_reads: bool,
    /// Drop a peer whose socket accepts no bytes for this long (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub write_timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Loopback port to connect to.
    #[arg(long, env = "JOTWIRE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// JSON payload.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub json: Option<String>,
    /// Read the JSON payload from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Wait for one response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
