use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use jotwire_transport::Endpoint;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    event: &'static str,
    message_type: Option<&'a str>,
    payload_size: usize,
    payload: &'a Value,
    peer: String,
    timestamp: String,
}

#[derive(Serialize)]
struct ListeningOutput {
    event: &'static str,
    endpoint: String,
    port: u16,
}

/// Print one received frame.
pub fn print_frame(message: &Value, peer: Endpoint, format: OutputFormat) {
    let compact = message.to_string();
    let message_type = message_type(message);

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                event: "frame-received",
                message_type,
                payload_size: compact.len(),
                payload: message,
                peer: peer.to_string(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SIZE", "PEER", "PAYLOAD"])
                .add_row(vec![
                    message_type.unwrap_or("-").to_string(),
                    compact.len().to_string(),
                    peer.to_string(),
                    compact,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let body = serde_json::to_string_pretty(message).unwrap_or_else(|_| compact.clone());
            println!(
                "type={} size={} peer={}\n{body}",
                message_type.unwrap_or("-"),
                compact.len(),
                peer
            );
        }
        OutputFormat::Raw => println!("{compact}"),
    }
}

/// Announce the bound endpoint, so callers that asked for port 0 learn the real one.
pub fn print_listening(endpoint: Endpoint, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ListeningOutput {
                event: "listening",
                endpoint: endpoint.to_string(),
                port: endpoint.port(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => println!("{endpoint}"),
        OutputFormat::Table | OutputFormat::Pretty => println!("listening on {endpoint}"),
    }
}

fn message_type(message: &Value) -> Option<&str> {
    message.get("type").and_then(Value::as_str)
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
