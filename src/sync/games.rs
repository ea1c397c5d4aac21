use std::{fmt, sync::Arc};

use crate::{
    connectors::ProviderConnector,
    error::SyncError,
    helpers::{system_clock, Clock},
    models::{ConnectorId, NewGame},
    store::EntityStore,
};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CatalogTickReport {
    pub fetched: usize,
    pub updated: usize,
    pub failed: usize,
}

impl fmt::Display for CatalogTickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} games fetched, {} new or updated, {} failed",
            self.fetched, self.updated, self.failed
        )
    }
}

/// Keeps the game catalog of one provider up to date. Games are never
/// deleted, ones the provider stops listing just stop being refreshed.
pub struct GameCatalogSync {
    connector: Arc<dyn ProviderConnector>,
    store: Arc<dyn EntityStore>,
    clock: Clock,
}

impl GameCatalogSync {
    pub fn new(connector: Arc<dyn ProviderConnector>, store: Arc<dyn EntityStore>) -> Self {
        GameCatalogSync {
            connector,
            store,
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

    pub async fn tick(&self) -> Result<CatalogTickReport, SyncError> {
        let connector = self.connector_id();
        let games = self
            .connector
            .list_games()
            .await
            .map_err(|source| SyncError::ProviderFetch { connector, source })?;

        let mut report = CatalogTickReport {
            fetched: games.len(),
            ..CatalogTickReport::default()
        };
        for snapshot in &games {
            let saved = async {
                let existing = self.store.find_game(connector, &snapshot.identifier).await?;
                let merged = NewGame::merge(existing.as_ref(), snapshot, connector, (self.clock)());
                let moved = existing.as_ref().map(|g| g.updated_at) != Some(merged.updated_at);
                self.store.save_game(merged).await?;

                Ok::<bool, SyncError>(moved)
            }
            .await;

            match saved {
                Ok(true) => report.updated += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        "[{}] Failed to save game {}: {}",
                        connector, snapshot.identifier, e
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    pub async fn run_tick(&self) {
        let connector = self.connector_id();
        debug!("[{}] Game catalog sync started", connector);
        match self.tick().await {
            Ok(report) => info!("[{}] Game catalog sync: {}", connector, report),
            Err(e) => error!("[{}] Game catalog sync aborted: {}", connector, e),
        }
    }
}

impl fmt::Debug for GameCatalogSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameCatalogSync")
            .field("connector", &self.connector_id())
            .finish_non_exhaustive()
    }
}
