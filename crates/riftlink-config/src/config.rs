//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Server connection settings.
    pub network: NetworkConfig,
    /// Local player identity.
    pub player: PlayerConfig,
    /// Consumer loop settings.
    pub client: ClientConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Server connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server host name or IP address.
    pub server_address: String,
    /// Server port.
    pub server_port: u16,
    /// Upper bound on a single connect attempt, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Largest frame body accepted or sent, in bytes.
    pub max_frame_bytes: u32,
    /// Backoff used when reconnecting.
    pub reconnect: ReconnectSettings,
}

/// Reconnect backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    /// Multiplier applied after each failed attempt.
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
    /// Jitter factor (0.0 - 1.0), applied as ± to each delay.
    pub jitter: f64,
}

/// Local player configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Identity sent with Login/Logout and compared against incoming
    /// damage targets.
    pub player_id: String,
}

/// Consumer loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// How often received messages are dispatched (Hz).
    pub tick_rate_hz: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// `EnvFilter` directives (e.g. "warn" or "info,riftlink_net=trace").
    /// Empty means the logging crate's built-in default.
    pub log_level: String,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            server_port: 9090,
            connect_timeout_ms: 5_000,
            max_frame_bytes: 1_048_576,
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            max_attempts: 20,
            jitter: 0.25,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            player_id: "player-1".to_string(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { tick_rate_hz: 60 }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info,riftlink_net=debug".to_string(),
        }
    }
}

// --- Derived values ---

impl NetworkConfig {
    /// `host:port` string suitable for dialling.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.server_address, self.server_port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl ReconnectSettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl ClientConfig {
    /// Interval between consumer ticks. A rate of 0 is treated as 1 Hz.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|source| ConfigError::ReadError {
                    path: config_path.clone(),
                    source,
                })?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("server_port: 9090"));
        assert!(ron_str.contains("tick_rate_hz: 60"));
        assert!(ron_str.contains("log_level: \"info,riftlink_net=debug\""));
    }

    #[test]
    fn test_default_endpoint_is_loopback() {
        assert_eq!(NetworkConfig::default().endpoint(), "127.0.0.1:9090");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(network: (server_port: 4000), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.network.server_port, 4000);
        assert_eq!(config.network.server_address, "127.0.0.1");
        assert_eq!(config.network.reconnect, ReconnectSettings::default());
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_durations() {
        let network = NetworkConfig::default();
        assert_eq!(network.connect_timeout(), Duration::from_secs(5));
        assert_eq!(network.reconnect.initial_delay(), Duration::from_secs(1));
        assert_eq!(network.reconnect.max_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_tick_interval() {
        assert_eq!(
            ClientConfig { tick_rate_hz: 50 }.tick_interval(),
            Duration::from_millis(20)
        );
        assert_eq!(
            ClientConfig { tick_rate_hz: 0 }.tick_interval(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.network.server_address = "10.0.0.1".to_string();
        config.player.player_id = "alice".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_ron_comments_preserved() {
        let ron_str = "// This is a comment\n(\n  // Another comment\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }
}
