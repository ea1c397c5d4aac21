use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::{
    error::StoreError,
    helpers::{system_clock, Clock},
    models::{Channel, Game, NewChannel, NewTracker, Tracker},
    store::{EntityStore, StoreResult},
};

/// Which channels race updates of a game get posted in. This is what the
/// chat side calls into when users add or remove trackers.
pub struct TrackerService {
    store: Arc<dyn EntityStore>,
    clock: Clock,
}

impl TrackerService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        TrackerService {
            store,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub async fn register_channel(
        &self,
        identifier: &str,
        server_identifier: Option<&str>,
        name: &str,
    ) -> StoreResult<Channel> {
        let existing = self.store.find_channel(identifier).await?;
        let merged = NewChannel::merge(existing.as_ref(), identifier, server_identifier, name, self.now());

        self.store.save_channel(merged).await
    }

    /// Activates `game` in `channel`. A game is meant to be tracked in one
    /// channel per server, so an active tracker for it elsewhere on the same
    /// server gets deactivated afterwards. The two writes are separate, so
    /// both trackers are briefly active in between.
    pub async fn add_tracker(&self, channel: &Channel, game: &Game) -> StoreResult<Tracker> {
        let on_server = match channel.server_identifier.as_deref() {
            Some(server) => self
                .find_trackers_by_server(server)
                .await?
                .into_iter()
                .find(|t| t.game_id == game.game_id && t.is_active),
            None => None,
        };

        let existing = self
            .store
            .find_tracker(channel.channel_id, game.game_id)
            .await?;
        let tracker = self
            .store
            .save_tracker(NewTracker::activate(
                existing.as_ref(),
                channel.channel_id,
                game.game_id,
                self.now(),
            ))
            .await?;

        if let Some(previous) = on_server.filter(|t| t.tracker_id != tracker.tracker_id) {
            debug!(
                "Moving tracker for game {} from channel {} to {}",
                game.identifier, previous.channel_id, channel.identifier
            );
            self.store
                .save_tracker(NewTracker::deactivate(&previous, self.now()))
                .await?;
        }

        Ok(tracker)
    }

    pub async fn find_trackers_by_channel(&self, channel_identifier: &str) -> StoreResult<Vec<Tracker>> {
        match self.store.find_channel(channel_identifier).await? {
            Some(channel) => {
                self.store
                    .find_trackers_by_channels(&[channel.channel_id])
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn find_trackers_by_server(&self, server_identifier: &str) -> StoreResult<Vec<Tracker>> {
        // an empty server would match every channel without one
        if server_identifier.is_empty() {
            return Ok(Vec::new());
        }

        let channel_ids: Vec<u32> = self
            .store
            .find_channels_by_server(server_identifier)
            .await?
            .iter()
            .map(|c| c.channel_id)
            .collect();
        if channel_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.store.find_trackers_by_channels(&channel_ids).await
    }

    pub async fn find_trackers_by_game(&self, game: &Game) -> StoreResult<Vec<Tracker>> {
        self.store.find_trackers_by_game(game.game_id).await
    }

    /// Returns `None` when the tracker is unknown.
    pub async fn disable_tracker(&self, tracker: &Tracker) -> StoreResult<Option<Tracker>> {
        let stored = match self.store.find_tracker_by_id(tracker.tracker_id).await? {
            Some(t) => t,
            None => {
                debug!("Tracker {} is gone, nothing to disable", tracker.identifier);
                return Ok(None);
            }
        };

        let disabled = self
            .store
            .save_tracker(NewTracker::deactivate(&stored, self.now()))
            .await?;

        Ok(Some(disabled))
    }

    /// Resolves a channel by identifier, failing when it was never registered.
    pub async fn channel(&self, identifier: &str) -> StoreResult<Channel> {
        self.store
            .find_channel(identifier)
            .await?
            .ok_or_else(|| StoreError::missing("channel", identifier))
    }
}
