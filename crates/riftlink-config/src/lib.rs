//! Configuration for the riftlink client.
//!
//! Settings persist to disk as `config.ron`, can be overridden from the
//! command line via clap, and tolerate missing or unknown fields so older and
//! newer files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, ClientConfig, Config, DebugConfig, NetworkConfig, PlayerConfig,
    ReconnectSettings,
};
pub use error::ConfigError;
