use std::{fs, path::Path};

use serde::Deserialize;
use url::Url;

use crate::{error::ConfigError, models::ConnectorId, sync::SyncSchedule};

const DEFAULT_GAME_SYNC_SECS: u64 = 3600;
const DEFAULT_RACE_SYNC_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connectors: Vec<ConnectorConfig>,
}

/// Everything one source worker needs to know about its provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    pub connector: ConnectorId,
    #[serde(default)]
    pub base_url: Option<Url>,
    #[serde(default = "default_game_sync")]
    pub game_sync_interval: SyncSchedule,
    #[serde(default = "default_race_sync")]
    pub race_sync_interval: SyncSchedule,
}

impl ConnectorConfig {
    pub fn new(connector: ConnectorId) -> Self {
        ConnectorConfig {
            connector,
            base_url: None,
            game_sync_interval: default_game_sync(),
            race_sync_interval: default_race_sync(),
        }
    }
}

fn default_game_sync() -> SyncSchedule {
    SyncSchedule::seconds(DEFAULT_GAME_SYNC_SECS)
}

fn default_race_sync() -> SyncSchedule {
    SyncSchedule::seconds(DEFAULT_RACE_SYNC_SECS)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            connectors: vec![ConnectorConfig::new(ConnectorId::RaceTimeGg)],
        }
    }
}

impl Config {
    pub fn from_yaml(yaml_bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_slice(yaml_bytes)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Config::from_yaml(&bytes)
    }

    // two workers for the same source would write the same natural keys from
    // two independent schedules
    fn validate(&self) -> Result<(), ConfigError> {
        for (i, c) in self.connectors.iter().enumerate() {
            if self.connectors[..i].iter().any(|o| o.connector == c.connector) {
                return Err(ConfigError::Invalid(format!(
                    "connector {} is configured more than once",
                    c.connector
                )));
            }
        }

        Ok(())
    }
}
