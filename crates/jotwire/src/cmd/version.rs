use jotwire_frame::PROTOCOL_TAG;
use jotwire_server::DEFAULT_PORT;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("jotwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: jotwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("JOTWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("JOTWIRE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("protocol_tag: {PROTOCOL_TAG}");
    println!("default_port: {DEFAULT_PORT}");
    println!(
        "features: server={}, cli=true",
        cfg!(feature = "server")
    );

    Ok(SUCCESS)
}
