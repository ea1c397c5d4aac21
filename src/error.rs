use std::path::PathBuf;

use thiserror::Error;

use crate::{helpers::BoxedError, models::ConnectorId};

/// A text value that doesn't map onto one of our enums.
#[derive(Debug, Clone, Error)]
#[error("Unrecognized {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        UnknownVariant {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Failure reaching or understanding a race source.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid provider url: {0}")]
    Url(#[from] url::ParseError),
    #[error("Malformed provider payload: {0}")]
    Malformed(String),
    #[error("No connector registered for {0}")]
    Unregistered(ConnectorId),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend failed: {0}")]
    Backend(#[source] BoxedError),
    #[error("Blocking storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("{kind} {key} does not exist")]
    Missing { kind: &'static str, key: String },
}

impl StoreError {
    pub fn missing<K: ToString>(kind: &'static str, key: K) -> Self {
        StoreError::Missing {
            kind,
            key: key.to_string(),
        }
    }
}

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Everything that can go wrong while reconciling one item of a sync tick.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Error fetching from {connector}: {source}")]
    ProviderFetch {
        connector: ConnectorId,
        #[source]
        source: ProviderError,
    },
    #[error("Race \"{race}\" references game \"{game}\" which is not in the catalog")]
    Resolution { race: String, game: String },
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}
