use std::{fmt, future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    config::ConnectorConfig,
    connectors::ProviderConnector,
    events::ChangeFeed,
    helpers::{system_clock, Clock},
    models::ConnectorId,
    store::EntityStore,
    sync::{GameCatalogSync, RaceSync},
};

/// Runs the catalog and race schedules of one provider. The catalog is
/// refreshed right away on start so races have games to resolve against;
/// the first race tick comes one period later.
pub struct SourceWorker {
    connector: Arc<dyn ProviderConnector>,
    store: Arc<dyn EntityStore>,
    feed: Arc<ChangeFeed>,
    config: ConnectorConfig,
    clock: Clock,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SourceWorker {
    pub fn new(
        connector: Arc<dyn ProviderConnector>,
        store: Arc<dyn EntityStore>,
        feed: Arc<ChangeFeed>,
        config: ConnectorConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        SourceWorker {
            connector,
            store,
            feed,
            config,
            clock: system_clock(),
            shutdown,
            tasks: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn connector_id(&self) -> ConnectorId {
        self.config.connector
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn start(&mut self) {
        if self.is_running() {
            warn!("[{}] Worker already started", self.connector_id());
            return;
        }

        let games = Arc::new(
            GameCatalogSync::new(Arc::clone(&self.connector), Arc::clone(&self.store))
                .with_clock(Arc::clone(&self.clock)),
        );
        let game_period = self.config.game_sync_interval.period();
        self.tasks.push(tokio::spawn(run_schedule(
            Instant::now(),
            game_period,
            self.shutdown.subscribe(),
            move || {
                let games = Arc::clone(&games);
                async move { games.run_tick().await }
            },
        )));

        let races = Arc::new(
            RaceSync::new(
                Arc::clone(&self.connector),
                Arc::clone(&self.store),
                Arc::clone(&self.feed),
            )
            .with_clock(Arc::clone(&self.clock)),
        );
        let race_period = self.config.race_sync_interval.period();
        self.tasks.push(tokio::spawn(run_schedule(
            Instant::now() + race_period,
            race_period,
            self.shutdown.subscribe(),
            move || {
                let races = Arc::clone(&races);
                async move { races.run_tick().await }
            },
        )));

        info!(
            "[{}] Worker started (games every {}, races every {})",
            self.connector_id(),
            self.config.game_sync_interval,
            self.config.race_sync_interval
        );
    }

    /// Stops both schedules. A tick that is already running is allowed to
    /// finish first.
    pub async fn dispose(mut self) {
        let connector = self.connector_id();
        // send_replace never fails, send does when every receiver is gone
        self.shutdown.send_replace(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("[{}] Sync task ended abnormally: {}", connector, e);
            }
        }
        info!("[{}] Worker stopped", connector);
    }
}

impl fmt::Debug for SourceWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceWorker")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn run_schedule<F, Fut>(
    start: Instant,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => job().await,
        }
    }
}
