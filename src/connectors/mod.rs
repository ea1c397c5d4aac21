use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::{
    config::ConnectorConfig,
    error::ProviderError,
    models::{ConnectorId, EntrantStatus, RaceStatus},
};

pub mod racetime;
pub mod srl;

pub use racetime::RaceTimeConnector;
pub use srl::SpeedRunsLiveConnector;

const USER_AGENT: &str = concat!("race-announcer/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub identifier: String,
    pub name: String,
    pub image_url: Option<String>,
}

/// The game a race snapshot points at, as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRef {
    pub identifier: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrantSnapshot {
    pub display_name: String,
    pub status: EntrantStatus,
    pub final_time: Option<u32>,
    pub place: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceSnapshot {
    pub identifier: String,
    pub game: GameRef,
    pub goal: Option<String>,
    pub status: RaceStatus,
    pub entrants: Vec<EntrantSnapshot>,
}

/// A race source. Both calls are plain reads and are expected to be called
/// over and over by the sync jobs.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    fn connector_id(&self) -> ConnectorId;

    // the full game catalog
    async fn list_games(&self) -> Result<Vec<GameSnapshot>, ProviderError>;

    // every race the provider currently lists as active, with its entrants
    async fn active_races(&self) -> Result<Vec<RaceSnapshot>, ProviderError>;
}

pub type ConnectorFactory = fn(&ConnectorConfig) -> Result<Arc<dyn ProviderConnector>, ProviderError>;

/// Builds connectors by their [`ConnectorId`].
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    factories: HashMap<ConnectorId, ConnectorFactory>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        ConnectorRegistry::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = ConnectorRegistry::new();
        registry.register(ConnectorId::RaceTimeGg, |config| {
            Ok(Arc::new(RaceTimeConnector::from_config(config)?))
        });
        registry.register(ConnectorId::SpeedRunsLive, |config| {
            Ok(Arc::new(SpeedRunsLiveConnector::from_config(config)?))
        });

        registry
    }

    pub fn register(&mut self, connector: ConnectorId, factory: ConnectorFactory) {
        if self.factories.insert(connector, factory).is_some() {
            debug!("Replaced connector factory for {}", connector);
        }
    }

    pub fn build(
        &self,
        config: &ConnectorConfig,
    ) -> Result<Arc<dyn ProviderConnector>, ProviderError> {
        let factory = self
            .factories
            .get(&config.connector)
            .ok_or(ProviderError::Unregistered(config.connector))?;

        factory(config)
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

pub(crate) fn http_client() -> Result<Client, ProviderError> {
    let client = Client::builder().user_agent(USER_AGENT).gzip(true).build()?;

    Ok(client)
}

// Url::join drops the last path segment of a base without a trailing slash,
// so normalize configured bases before we join endpoints onto them
pub(crate) fn base_url(configured: Option<&Url>, default: &str) -> Result<Url, ProviderError> {
    let mut base = match configured {
        Some(u) => u.clone(),
        None => Url::parse(default)?,
    };
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    Ok(base)
}
