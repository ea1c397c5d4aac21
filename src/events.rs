use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::models::{EntrantDetail, Game, Race};

/// Post-reconciliation state of a race whose persisted data moved during a
/// sync tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceChange {
    pub race: Race,
    pub game: Game,
    pub entrants: Vec<EntrantDetail>,
}

/// Consumer of race changes, e.g. whatever posts race updates to chat.
#[async_trait]
pub trait ChangeEventSink: Send + Sync {
    async fn race_changed(&self, change: &RaceChange);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fan-out of race changes to every subscribed sink, in the order they
/// subscribed.
#[derive(Default)]
pub struct ChangeFeed {
    next_id: AtomicU64,
    sinks: RwLock<Vec<(SubscriptionId, Arc<dyn ChangeEventSink>)>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        ChangeFeed::default()
    }

    pub async fn subscribe(&self, sink: Arc<dyn ChangeEventSink>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sinks.write().await.push((id, sink));
        debug!("Change sink {} subscribed", id);

        id
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut sinks = self.sinks.write().await;
        let before = sinks.len();
        sinks.retain(|(s, _)| *s != id);

        sinks.len() != before
    }

    pub async fn subscriber_count(&self) -> usize {
        self.sinks.read().await.len()
    }

    pub async fn publish(&self, change: &RaceChange) {
        // don't hold the lock across sink calls, a sink may (un)subscribe
        let sinks: Vec<Arc<dyn ChangeEventSink>> = self
            .sinks
            .read()
            .await
            .iter()
            .map(|(_, sink)| Arc::clone(sink))
            .collect();

        for sink in sinks {
            sink.race_changed(change).await;
        }
    }
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

/// Writes a one-line summary of every change to the log.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogSink;

#[async_trait]
impl ChangeEventSink for LogSink {
    async fn race_changed(&self, change: &RaceChange) {
        let finished = change
            .entrants
            .iter()
            .filter(|e| e.entrant.final_time.is_some())
            .count();
        if change.race.status.is_terminal() {
            info!(
                "[{}] {} race {} ({}) is {} with {}/{} finishers",
                change.race.connector,
                change.game.name,
                change.race.identifier,
                change.race.goal,
                change.race.status,
                finished,
                change.entrants.len()
            );
        } else {
            info!(
                "[{}] {} race {} ({}) is {} with {} entrants",
                change.race.connector,
                change.game.name,
                change.race.identifier,
                change.race.goal,
                change.race.status,
                change.entrants.len()
            );
        }
    }
}

/// Forwards changes into a bounded channel. Waits for capacity rather than
/// dropping changes.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<RaceChange>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<RaceChange>) -> Self {
        ChannelSink { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RaceChange>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelSink { tx }, rx)
    }
}

#[async_trait]
impl ChangeEventSink for ChannelSink {
    async fn race_changed(&self, change: &RaceChange) {
        if self.tx.send(change.clone()).await.is_err() {
            warn!(
                "Receiver for race changes is gone, dropping change for {}",
                change.race.identifier
            );
        }
    }
}
