use std::{fmt, sync::Arc};

use chrono::NaiveDateTime;

use crate::{
    connectors::{EntrantSnapshot, ProviderConnector, RaceSnapshot},
    error::SyncError,
    events::{ChangeFeed, RaceChange},
    helpers::{system_clock, Clock},
    models::{ConnectorId, NewEntrant, NewRace, NewRacer, Racer},
    store::EntityStore,
};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RaceTickReport {
    pub fetched: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for RaceTickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} races fetched, {} changed, {} unchanged, {} skipped, {} failed",
            self.fetched, self.changed, self.unchanged, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaceOutcome {
    Changed,
    Unchanged,
}

/// Mirrors a provider's active races into the store and publishes a
/// [`RaceChange`] for every race whose persisted state moved.
pub struct RaceSync {
    connector: Arc<dyn ProviderConnector>,
    store: Arc<dyn EntityStore>,
    feed: Arc<ChangeFeed>,
    clock: Clock,
}

impl RaceSync {
    pub fn new(
        connector: Arc<dyn ProviderConnector>,
        store: Arc<dyn EntityStore>,
        feed: Arc<ChangeFeed>,
    ) -> Self {
        RaceSync {
            connector,
            store,
            feed,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn connector_id(&self) -> ConnectorId {
        self.connector.connector_id()
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// One pass over the provider's active races. Only a failed fetch fails
    /// the tick; anything going wrong with a single race is logged and counted
    /// in the report.
    pub async fn tick(&self) -> Result<RaceTickReport, SyncError> {
        let tick_at = self.now();
        let connector = self.connector_id();
        let snapshots = self
            .connector
            .active_races()
            .await
            .map_err(|source| SyncError::ProviderFetch { connector, source })?;

        let mut report = RaceTickReport {
            fetched: snapshots.len(),
            ..RaceTickReport::default()
        };
        for snapshot in &snapshots {
            match self.sync_race(snapshot, tick_at).await {
                Ok(RaceOutcome::Changed) => report.changed += 1,
                Ok(RaceOutcome::Unchanged) => report.unchanged += 1,
                Err(e @ SyncError::Resolution { .. }) => {
                    warn!("[{}] Skipping race: {}", connector, e);
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(
                        "[{}] Failed to sync race {}: {}",
                        connector, snapshot.identifier, e
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// [`RaceSync::tick`] with its outcome logged, for use on a schedule.
    pub async fn run_tick(&self) {
        let connector = self.connector_id();
        debug!("[{}] Race sync tick started", connector);
        match self.tick().await {
            Ok(report) if report.failed > 0 => warn!("[{}] Race sync: {}", connector, report),
            Ok(report) => info!("[{}] Race sync: {}", connector, report),
            Err(e) => error!("[{}] Race sync tick aborted: {}", connector, e),
        }
    }

    /// Reconciles a single race snapshot observed at `tick_at`.
    pub async fn sync_race(
        &self,
        snapshot: &RaceSnapshot,
        tick_at: NaiveDateTime,
    ) -> Result<RaceOutcome, SyncError> {
        let connector = self.connector_id();
        let game = self
            .store
            .find_game(connector, &snapshot.game.identifier)
            .await?
            .ok_or_else(|| SyncError::Resolution {
                race: snapshot.identifier.clone(),
                game: snapshot.game.identifier.clone(),
            })?;

        let mut resolved = Vec::new();
        for entrant in collapse_entrants(&snapshot.entrants) {
            let racer = self.resolve_racer(connector, &entrant.display_name).await?;
            resolved.push((racer, entrant));
        }

        let existing = self.store.find_race(connector, &snapshot.identifier).await?;
        let merged = NewRace::merge(
            existing.as_ref(),
            snapshot,
            connector,
            game.game_id,
            tick_at,
            self.now(),
        );
        let has_race_changes = existing.as_ref().map(|r| r.updated_at) != Some(merged.updated_at);
        let race = self.store.save_race(merged).await?;

        let persisted = self.store.find_entrants(race.race_id).await?;
        let mut entrant_moved = false;
        for (racer, entrant) in &resolved {
            let previous = persisted
                .iter()
                .find(|d| d.racer.racer_id == racer.racer_id)
                .map(|d| &d.entrant);
            let merged = NewEntrant::merge(previous, race.race_id, racer.racer_id, entrant, self.now());
            if previous.map(|e| e.updated_at) != Some(merged.updated_at) {
                entrant_moved = true;
            }
            self.store.save_entrant(merged).await?;
        }

        let stale: Vec<u32> = persisted
            .iter()
            .filter(|d| !resolved.iter().any(|(r, _)| r.racer_id == d.racer.racer_id))
            .map(|d| d.entrant.entrant_id)
            .collect();
        let removed = if stale.is_empty() {
            0
        } else {
            self.store.delete_entrants(race.race_id, &stale).await?
        };

        let has_entrant_changes =
            removed > 0 || persisted.len() != resolved.len() || entrant_moved;
        let changed = has_race_changes || has_entrant_changes;
        let changed_at = if changed { Some(self.now()) } else { None };
        let race = self
            .store
            .save_race(NewRace::touch(&race, tick_at, changed_at))
            .await?;

        if !changed {
            return Ok(RaceOutcome::Unchanged);
        }

        debug!(
            "[{}] Race {} changed (race: {}, entrants: {}, removed: {})",
            connector, race.identifier, has_race_changes, has_entrant_changes, removed
        );
        let entrants = self.store.find_entrants(race.race_id).await?;
        self.feed
            .publish(&RaceChange {
                race,
                game,
                entrants,
            })
            .await;

        Ok(RaceOutcome::Changed)
    }

    async fn resolve_racer(
        &self,
        connector: ConnectorId,
        display_name: &str,
    ) -> Result<Racer, SyncError> {
        let identifier = NewRacer::identifier_for(display_name);
        let existing = self.store.find_racer(connector, &identifier).await?;
        let racer = match existing {
            Some(racer) if racer.display_name == display_name => racer,
            existing => {
                let merged = NewRacer::merge(existing.as_ref(), display_name, connector, self.now());
                self.store.save_racer(merged).await?
            }
        };

        Ok(racer)
    }
}

impl fmt::Debug for RaceSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaceSync")
            .field("connector", &self.connector_id())
            .finish_non_exhaustive()
    }
}

// Entrants whose names only differ in case are the same racer. The last one
// listed wins, in the position of the first.
fn collapse_entrants(entrants: &[EntrantSnapshot]) -> Vec<&EntrantSnapshot> {
    let mut collapsed: Vec<(String, &EntrantSnapshot)> = Vec::with_capacity(entrants.len());
    for entrant in entrants {
        let identifier = NewRacer::identifier_for(&entrant.display_name);
        match collapsed.iter_mut().find(|(id, _)| *id == identifier) {
            Some(slot) => slot.1 = entrant,
            None => collapsed.push((identifier, entrant)),
        }
    }

    collapsed.into_iter().map(|(_, e)| e).collect()
}
