//! The binary entry point for the headless riftlink client.

use clap::Parser;
use riftlink_client::platform::PlatformDirs;
use riftlink_client::session::ClientSession;
use riftlink_config::{CliArgs, Config};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve(args.config.as_deref()) {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to resolve platform directories: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = dirs.create_dirs() {
        eprintln!("Failed to create platform directories: {e}");
        std::process::exit(1);
    }

    let mut config = match Config::load_or_create(&dirs.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    if let Err(e) = riftlink_log::init_logging(
        Some(&dirs.log_dir),
        cfg!(debug_assertions),
        Some(&config),
    ) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }
    tracing::info!(
        config_dir = %dirs.config_dir.display(),
        endpoint = %config.network.endpoint(),
        player_id = %config.player.player_id,
        "riftlink client starting"
    );

    let mut session = ClientSession::new(&config);
    if let Err(e) = session.start().await {
        tracing::warn!(error = %e, "initial connect failed, will retry");
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };
    if let Err(e) = session.run_until(shutdown).await {
        tracing::error!(error = %e, "client stopped");
        std::process::exit(1);
    }
}
