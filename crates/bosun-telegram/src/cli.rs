//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

use bosun_config::BotMode;

/// bosun — Telegram operations agent for a Docker host.
#[derive(Debug, Parser)]
#[command(name = "bosun")]
#[command(author, version, about = "Telegram operations agent for a Docker host")]
pub struct Args {
    /// Which bot token to use.
    #[arg(long, value_parser = parse_mode, default_value = "prod")]
    pub mode: BotMode,

    /// Log verbosity.
    #[arg(long = "log-level", value_parser = ["DEBUG", "INFO", "ERROR"], default_value = "INFO")]
    pub log_level: String,

    /// Whether log output is colourised.
    #[arg(long = "colorize_logs", value_parser = parse_pybool, default_value = "True")]
    pub colorize_logs: bool,

    /// Receive updates over a webhook instead of long polling.
    #[arg(long, value_parser = parse_pybool, default_value = "False")]
    pub webhook: bool,

    /// Listen address in webhook mode.
    #[arg(long = "socket_host", default_value = "127.0.0.1")]
    pub socket_host: String,

    /// Plugins to load at startup.
    #[arg(long, num_args = 1..)]
    pub plugins: Vec<String>,

    /// Print health status and exit (0 healthy, 1 unhealthy, 2 unknown).
    #[arg(long = "health_check")]
    pub health_check: bool,

    /// Explicit configuration file path.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_mode(value: &str) -> Result<BotMode, String> {
    match value {
        "prod" => Ok(BotMode::Prod),
        "dev" => Ok(BotMode::Dev),
        other => Err(format!("invalid mode '{other}', expected dev or prod")),
    }
}

/// Accept the historical `True`/`False` argument style alongside lowercase.
fn parse_pybool(value: &str) -> Result<bool, String> {
    match value {
        "True" | "true" => Ok(true),
        "False" | "false" => Ok(false),
        other => Err(format!("invalid boolean '{other}', expected True or False")),
    }
}
