#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tokio::sync::Mutex as AsyncMutex;

use race_announcer::{
    connectors::{EntrantSnapshot, GameRef, GameSnapshot, ProviderConnector, RaceSnapshot},
    error::ProviderError,
    events::{ChangeEventSink, RaceChange},
    helpers::Clock,
    models::{ConnectorId, EntrantStatus, RaceStatus},
};

/// Connector serving whatever the test last handed it.
pub struct ScriptedConnector {
    id: ConnectorId,
    games: Mutex<Vec<GameSnapshot>>,
    races: Mutex<Vec<RaceSnapshot>>,
    failing: AtomicBool,
    pub game_calls: AtomicUsize,
    pub race_calls: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(id: ConnectorId) -> Arc<Self> {
        Arc::new(ScriptedConnector {
            id,
            games: Mutex::new(Vec::new()),
            races: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            game_calls: AtomicUsize::new(0),
            race_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_games(&self, games: Vec<GameSnapshot>) {
        *self.games.lock().unwrap() = games;
    }

    pub fn set_races(&self, races: Vec<RaceSnapshot>) {
        *self.races.lock().unwrap() = races;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Malformed("provider is down".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderConnector for ScriptedConnector {
    fn connector_id(&self) -> ConnectorId {
        self.id
    }

    async fn list_games(&self) -> Result<Vec<GameSnapshot>, ProviderError> {
        self.game_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.games.lock().unwrap().clone())
    }

    async fn active_races(&self) -> Result<Vec<RaceSnapshot>, ProviderError> {
        self.race_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.races.lock().unwrap().clone())
    }
}

/// Records every change it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub changes: AsyncMutex<Vec<RaceChange>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingSink::default())
    }

    pub async fn count(&self) -> usize {
        self.changes.lock().await.len()
    }

    pub async fn take(&self) -> Vec<RaceChange> {
        std::mem::take(&mut *self.changes.lock().await)
    }
}

#[async_trait]
impl ChangeEventSink for RecordingSink {
    async fn race_changed(&self, change: &RaceChange) {
        self.changes.lock().await.push(change.clone());
    }
}

pub fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 1, 12)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap()
}

/// A clock that moves one second forward every time it's read.
pub fn step_clock() -> Clock {
    let seconds = Arc::new(AtomicI64::new(0));
    Arc::new(move || epoch() + Duration::seconds(seconds.fetch_add(1, Ordering::SeqCst)))
}

pub fn game(identifier: &str, name: &str) -> GameSnapshot {
    GameSnapshot {
        identifier: identifier.to_owned(),
        name: name.to_owned(),
        image_url: None,
    }
}

pub fn entrant(name: &str, status: EntrantStatus) -> EntrantSnapshot {
    EntrantSnapshot {
        display_name: name.to_owned(),
        status,
        final_time: None,
        place: None,
    }
}

pub fn finished(name: &str, final_time: u32, place: u32) -> EntrantSnapshot {
    EntrantSnapshot {
        display_name: name.to_owned(),
        status: EntrantStatus::Done,
        final_time: Some(final_time),
        place: Some(place),
    }
}

pub fn race(
    identifier: &str,
    game: &str,
    status: RaceStatus,
    entrants: Vec<EntrantSnapshot>,
) -> RaceSnapshot {
    RaceSnapshot {
        identifier: identifier.to_owned(),
        game: GameRef {
            identifier: game.to_owned(),
            name: game.to_owned(),
        },
        goal: Some("Beat the game".to_owned()),
        status,
        entrants,
    }
}
