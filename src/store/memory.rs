use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    models::{
        Channel, ConnectorId, Entrant, EntrantDetail, Game, NewChannel, NewEntrant, NewGame,
        NewRace, NewRacer, NewTracker, Race, Racer, Tracker,
    },
    store::{EntityStore, StoreResult},
};

#[derive(Debug, Default)]
struct Tables {
    last_id: u32,
    games: Vec<Game>,
    racers: Vec<Racer>,
    races: Vec<Race>,
    entrants: Vec<Entrant>,
    channels: Vec<Channel>,
    trackers: Vec<Tracker>,
}

impl Tables {
    fn next_id(&mut self) -> u32 {
        self.last_id += 1;
        self.last_id
    }
}

/// Process-local store. Used when no database is configured and by the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub async fn games(&self) -> Vec<Game> {
        self.tables.read().await.games.clone()
    }

    pub async fn racers(&self) -> Vec<Racer> {
        self.tables.read().await.racers.clone()
    }

    pub async fn races(&self) -> Vec<Race> {
        self.tables.read().await.races.clone()
    }

    pub async fn entrant_count(&self) -> usize {
        self.tables.read().await.entrants.len()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_game(
        &self,
        connector: ConnectorId,
        identifier: &str,
    ) -> StoreResult<Option<Game>> {
        let tables = self.tables.read().await;
        Ok(tables
            .games
            .iter()
            .find(|g| g.connector == connector && g.identifier == identifier)
            .cloned())
    }

    async fn save_game(&self, game: NewGame) -> StoreResult<Game> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables
            .games
            .iter_mut()
            .find(|g| g.connector == game.connector && g.identifier == game.identifier)
        {
            stored.name = game.name;
            stored.image_url = game.image_url;
            stored.updated_at = game.updated_at;
            return Ok(stored.clone());
        }

        let stored = Game {
            game_id: tables.next_id(),
            identifier: game.identifier,
            connector: game.connector,
            name: game.name,
            image_url: game.image_url,
            created_at: game.updated_at,
            updated_at: game.updated_at,
        };
        tables.games.push(stored.clone());

        Ok(stored)
    }

    async fn find_racer(
        &self,
        connector: ConnectorId,
        identifier: &str,
    ) -> StoreResult<Option<Racer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .racers
            .iter()
            .find(|r| r.connector == connector && r.identifier == identifier)
            .cloned())
    }

    async fn save_racer(&self, racer: NewRacer) -> StoreResult<Racer> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables
            .racers
            .iter_mut()
            .find(|r| r.connector == racer.connector && r.identifier == racer.identifier)
        {
            stored.display_name = racer.display_name;
            stored.updated_at = racer.updated_at;
            return Ok(stored.clone());
        }

        let stored = Racer {
            racer_id: tables.next_id(),
            identifier: racer.identifier,
            connector: racer.connector,
            display_name: racer.display_name,
            created_at: racer.updated_at,
            updated_at: racer.updated_at,
        };
        tables.racers.push(stored.clone());

        Ok(stored)
    }

    async fn find_race(
        &self,
        connector: ConnectorId,
        identifier: &str,
    ) -> StoreResult<Option<Race>> {
        let tables = self.tables.read().await;
        Ok(tables
            .races
            .iter()
            .find(|r| r.connector == connector && r.identifier == identifier)
            .cloned())
    }

    async fn save_race(&self, race: NewRace) -> StoreResult<Race> {
        let mut tables = self.tables.write().await;
        if !tables.games.iter().any(|g| g.game_id == race.game_id) {
            return Err(StoreError::missing("game", race.game_id));
        }
        if let Some(stored) = tables
            .races
            .iter_mut()
            .find(|r| r.connector == race.connector && r.identifier == race.identifier)
        {
            stored.game_id = race.game_id;
            stored.goal = race.goal;
            stored.status = race.status;
            stored.last_sync_at = race.last_sync_at;
            stored.last_change_at = race.last_change_at;
            stored.updated_at = race.updated_at;
            return Ok(stored.clone());
        }

        let stored = Race {
            race_id: tables.next_id(),
            identifier: race.identifier,
            connector: race.connector,
            game_id: race.game_id,
            goal: race.goal,
            status: race.status,
            last_sync_at: race.last_sync_at,
            last_change_at: race.last_change_at,
            created_at: race.updated_at,
            updated_at: race.updated_at,
        };
        tables.races.push(stored.clone());

        Ok(stored)
    }

    async fn find_entrants(&self, race_id: u32) -> StoreResult<Vec<EntrantDetail>> {
        let tables = self.tables.read().await;
        let mut details = Vec::new();
        for entrant in tables.entrants.iter().filter(|e| e.race_id == race_id) {
            let racer = tables
                .racers
                .iter()
                .find(|r| r.racer_id == entrant.racer_id)
                .ok_or_else(|| StoreError::missing("racer", entrant.racer_id))?;
            details.push(EntrantDetail {
                entrant: entrant.clone(),
                racer: racer.clone(),
            });
        }

        Ok(details)
    }

    async fn save_entrant(&self, entrant: NewEntrant) -> StoreResult<Entrant> {
        let mut tables = self.tables.write().await;
        if !tables.races.iter().any(|r| r.race_id == entrant.race_id) {
            return Err(StoreError::missing("race", entrant.race_id));
        }
        if !tables.racers.iter().any(|r| r.racer_id == entrant.racer_id) {
            return Err(StoreError::missing("racer", entrant.racer_id));
        }
        if let Some(stored) = tables
            .entrants
            .iter_mut()
            .find(|e| e.race_id == entrant.race_id && e.racer_id == entrant.racer_id)
        {
            stored.status = entrant.status;
            stored.final_time = entrant.final_time;
            stored.place = entrant.place;
            stored.updated_at = entrant.updated_at;
            return Ok(stored.clone());
        }

        let stored = Entrant {
            entrant_id: tables.next_id(),
            race_id: entrant.race_id,
            racer_id: entrant.racer_id,
            status: entrant.status,
            final_time: entrant.final_time,
            place: entrant.place,
            created_at: entrant.updated_at,
            updated_at: entrant.updated_at,
        };
        tables.entrants.push(stored.clone());

        Ok(stored)
    }

    async fn delete_entrants(&self, race_id: u32, entrant_ids: &[u32]) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;
        let before = tables.entrants.len();
        tables
            .entrants
            .retain(|e| !(e.race_id == race_id && entrant_ids.contains(&e.entrant_id)));

        Ok(before - tables.entrants.len())
    }

    async fn find_channel(&self, identifier: &str) -> StoreResult<Option<Channel>> {
        let tables = self.tables.read().await;
        Ok(tables
            .channels
            .iter()
            .find(|c| c.identifier == identifier)
            .cloned())
    }

    async fn find_channels_by_server(&self, server_identifier: &str) -> StoreResult<Vec<Channel>> {
        let tables = self.tables.read().await;
        Ok(tables
            .channels
            .iter()
            .filter(|c| c.server_identifier.as_deref() == Some(server_identifier))
            .cloned()
            .collect())
    }

    async fn save_channel(&self, channel: NewChannel) -> StoreResult<Channel> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables
            .channels
            .iter_mut()
            .find(|c| c.identifier == channel.identifier)
        {
            stored.server_identifier = channel.server_identifier;
            stored.name = channel.name;
            stored.updated_at = channel.updated_at;
            return Ok(stored.clone());
        }

        let stored = Channel {
            channel_id: tables.next_id(),
            identifier: channel.identifier,
            server_identifier: channel.server_identifier,
            name: channel.name,
            created_at: channel.updated_at,
            updated_at: channel.updated_at,
        };
        tables.channels.push(stored.clone());

        Ok(stored)
    }

    async fn find_tracker(&self, channel_id: u32, game_id: u32) -> StoreResult<Option<Tracker>> {
        let tables = self.tables.read().await;
        Ok(tables
            .trackers
            .iter()
            .find(|t| t.channel_id == channel_id && t.game_id == game_id)
            .cloned())
    }

    async fn find_tracker_by_id(&self, tracker_id: u32) -> StoreResult<Option<Tracker>> {
        let tables = self.tables.read().await;
        Ok(tables
            .trackers
            .iter()
            .find(|t| t.tracker_id == tracker_id)
            .cloned())
    }

    async fn find_trackers_by_channels(&self, channel_ids: &[u32]) -> StoreResult<Vec<Tracker>> {
        let tables = self.tables.read().await;
        Ok(tables
            .trackers
            .iter()
            .filter(|t| channel_ids.contains(&t.channel_id))
            .cloned()
            .collect())
    }

    async fn find_trackers_by_game(&self, game_id: u32) -> StoreResult<Vec<Tracker>> {
        let tables = self.tables.read().await;
        Ok(tables
            .trackers
            .iter()
            .filter(|t| t.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn save_tracker(&self, tracker: NewTracker) -> StoreResult<Tracker> {
        let mut tables = self.tables.write().await;
        if !tables.channels.iter().any(|c| c.channel_id == tracker.channel_id) {
            return Err(StoreError::missing("channel", tracker.channel_id));
        }
        if !tables.games.iter().any(|g| g.game_id == tracker.game_id) {
            return Err(StoreError::missing("game", tracker.game_id));
        }
        if let Some(stored) = tables
            .trackers
            .iter_mut()
            .find(|t| t.channel_id == tracker.channel_id && t.game_id == tracker.game_id)
        {
            stored.is_active = tracker.is_active;
            stored.updated_at = tracker.updated_at;
            return Ok(stored.clone());
        }

        let stored = Tracker {
            tracker_id: tables.next_id(),
            identifier: tracker.identifier,
            channel_id: tracker.channel_id,
            game_id: tracker.game_id,
            is_active: tracker.is_active,
            created_at: tracker.updated_at,
            updated_at: tracker.updated_at,
        };
        tables.trackers.push(stored.clone());

        Ok(stored)
    }
}
