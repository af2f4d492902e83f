#![forbid(unsafe_code)]

mod cli;
mod commands;
mod shutdown;

use std::path::Path;

use anyhow::Result;

use cli::Command;
use infrastructure::config::AgentConfig;
use infrastructure::constants::DEFAULT_CONFIG_PATH;
use infrastructure::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();

    if matches!(cli.command, Some(Command::Version)) {
        println!("netfence-agent {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // A missing config file is only acceptable at the default path; an
    // explicitly given path that cannot be read is an error.
    let config = if cli.config == DEFAULT_CONFIG_PATH {
        AgentConfig::load_or_default(Path::new(&cli.config))?
    } else {
        AgentConfig::load(Path::new(&cli.config))?
    };
    init_logging(
        cli.log_level.unwrap_or(config.agent.log_level),
        cli.log_format.unwrap_or(config.agent.log_format),
    );

    match cli.command {
        Some(Command::Version) => unreachable!("handled above"),

        Some(Command::Apply { map }) => {
            let path = map.unwrap_or(config.acl.network_map_path);
            commands::cmd_apply(Path::new(&path), cli.output)
        }

        Some(Command::Watch { map }) => {
            let path = map.unwrap_or(config.acl.network_map_path);
            commands::cmd_watch(Path::new(&path)).await
        }

        // Watching the configured map is the default mode.
        None => commands::cmd_watch(Path::new(&config.acl.network_map_path)).await,
    }
}
