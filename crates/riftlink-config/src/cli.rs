//! Command-line argument parsing for the riftlink client.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// riftlink client command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "riftlink", about = "Headless riftlink game client")]
pub struct CliArgs {
    /// Server address.
    #[arg(long)]
    pub server: Option<String>,

    /// Server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Player id used for login.
    #[arg(long)]
    pub player_id: Option<String>,

    /// Dispatch tick rate in Hz.
    #[arg(long)]
    pub tick_rate: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref addr) = args.server {
            self.network.server_address = addr.clone();
        }
        if let Some(port) = args.port {
            self.network.server_port = port;
        }
        if let Some(ref id) = args.player_id {
            self.player.player_id = id.clone();
        }
        if let Some(rate) = args.tick_rate {
            self.client.tick_rate_hz = rate;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
