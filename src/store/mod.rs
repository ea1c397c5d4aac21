use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{
        Channel, ConnectorId, Entrant, EntrantDetail, Game, NewChannel, NewEntrant, NewGame,
        NewRace, NewRacer, NewTracker, Race, Racer, Tracker,
    },
};

pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;

pub use memory::MemoryStore;
#[cfg(feature = "mysql")]
pub use mysql::{get_pool, MysqlPool, MysqlStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract the sync jobs and tracker service are written against.
///
/// Every `save_*` is an upsert on the entity's natural key: when a record with
/// that key exists its mutable fields are overwritten and its id and creation
/// time are kept, otherwise a new record is inserted. The stored record is
/// returned either way.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_game(&self, connector: ConnectorId, identifier: &str)
        -> StoreResult<Option<Game>>;

    async fn save_game(&self, game: NewGame) -> StoreResult<Game>;

    async fn find_racer(
        &self,
        connector: ConnectorId,
        identifier: &str,
    ) -> StoreResult<Option<Racer>>;

    async fn save_racer(&self, racer: NewRacer) -> StoreResult<Racer>;

    async fn find_race(&self, connector: ConnectorId, identifier: &str)
        -> StoreResult<Option<Race>>;

    async fn save_race(&self, race: NewRace) -> StoreResult<Race>;

    /// Entrants of a race joined with their racers, in insertion order.
    async fn find_entrants(&self, race_id: u32) -> StoreResult<Vec<EntrantDetail>>;

    /// Keyed by (race, racer). Fails if either side doesn't exist.
    async fn save_entrant(&self, entrant: NewEntrant) -> StoreResult<Entrant>;

    /// Returns how many entrants were removed.
    async fn delete_entrants(&self, race_id: u32, entrant_ids: &[u32]) -> StoreResult<usize>;

    async fn find_channel(&self, identifier: &str) -> StoreResult<Option<Channel>>;

    async fn find_channels_by_server(&self, server_identifier: &str) -> StoreResult<Vec<Channel>>;

    async fn save_channel(&self, channel: NewChannel) -> StoreResult<Channel>;

    async fn find_tracker(&self, channel_id: u32, game_id: u32) -> StoreResult<Option<Tracker>>;

    async fn find_tracker_by_id(&self, tracker_id: u32) -> StoreResult<Option<Tracker>>;

    async fn find_trackers_by_channels(&self, channel_ids: &[u32]) -> StoreResult<Vec<Tracker>>;

    async fn find_trackers_by_game(&self, game_id: u32) -> StoreResult<Vec<Tracker>>;

    /// Keyed by (channel, game).
    async fn save_tracker(&self, tracker: NewTracker) -> StoreResult<Tracker>;
}
