//! Minimal echo server: every frame is sent back to the peer that sent it.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --features cli -- send --port 2016 --json '{"hello":"world"}' --wait

use std::thread;
use std::time::Duration;

use jotwire::server::{JsonServer, ServerConfig};
use serde_json::Value;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = JsonServer::start(ServerConfig::default(), |message: Value| {
        eprintln!("received {message}");
        Some(message)
    })?;
    eprintln!("Listening on {}", server.local_endpoint());

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}
