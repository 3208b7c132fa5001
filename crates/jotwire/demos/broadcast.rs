//! Pushes a tick to every connected peer once a second.
//!
//! Run with:
//!   cargo run --example broadcast
//!
//! Then connect any number of clients, e.g. with `nc 127.0.0.1 2016 | xxd`.

use std::thread;
use std::time::Duration;

use jotwire::server::{JsonServer, ServerConfig};
use serde_json::{json, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = JsonServer::start(ServerConfig::default(), |_: Value| -> Option<Value> { None })?;
    eprintln!("Broadcasting on {}", server.local_endpoint());

    for tick in 0u64.. {
        let report = server.broadcast(&json!({"type": "tick", "n": tick}))?;
        if !report.pruned.is_empty() {
            eprintln!("dropped {:?}", report.pruned);
        }
        eprintln!("tick {tick} delivered to {}", report.delivered);
        thread::sleep(Duration::from_secs(1));
    }
    Ok(())
}
