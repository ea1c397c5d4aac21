#[cfg(feature = "mysql")]
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate log;

pub mod config;
pub mod connectors;
pub mod error;
pub mod events;
pub mod helpers;
pub mod models;
#[cfg(feature = "mysql")]
mod schema;
pub mod store;
pub mod sync;
pub mod trackers;

pub use config::{Config, ConnectorConfig};
pub use connectors::{ConnectorRegistry, ProviderConnector};
pub use events::{ChangeEventSink, ChangeFeed, RaceChange};
pub use store::{EntityStore, MemoryStore};
pub use sync::{GameCatalogSync, RaceSync, SourceWorker};
pub use trackers::TrackerService;
