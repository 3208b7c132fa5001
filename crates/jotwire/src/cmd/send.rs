use std::fs;
use std::time::Duration;

use jotwire_frame::FrameConfig;
use jotwire_server::connect_with_config;
use jotwire_transport::Endpoint;
use serde_json::Value;
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{io_error, server_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let endpoint = Endpoint::localhost(args.port);
    let config = FrameConfig {
        read_timeout: Some(wait_timeout),
        write_timeout: Some(wait_timeout),
        ..FrameConfig::default()
    };
    let mut client = connect_with_config(endpoint, config)
        .map_err(|err| server_error(&format!("connect to {endpoint} failed"), err))?;

    client
        .send(&payload)
        .map_err(|err| server_error("send failed", err))?;
    debug!(%endpoint, "frame sent");

    if args.wait {
        let response = client
            .recv()
            .map_err(|err| server_error("receive failed", err))?;
        print_frame(&response, client.peer(), format);
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Value> {
    if let Some(json) = &args.json {
        return serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")));
    }
    if let Some(path) = &args.file {
        let bytes = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return serde_json::from_slice(&bytes).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("{} is not valid JSON: {err}", path.display()),
            )
        });
    }
    Err(CliError::new(USAGE, "one of --json or --file is required"))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
