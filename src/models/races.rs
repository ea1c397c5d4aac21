use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    connectors::RaceSnapshot,
    error::UnknownVariant,
    helpers::latest,
    models::ConnectorId,
};

// providers don't always set a goal; we store a placeholder so the column stays
// non-null
pub const NO_GOAL: &str = "-";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Open,
    InProgress,
    Finished,
    Cancelled,
}

impl RaceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RaceStatus::Finished | RaceStatus::Cancelled)
    }
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RaceStatus::Open => write!(f, "open"),
            RaceStatus::InProgress => write!(f, "in_progress"),
            RaceStatus::Finished => write!(f, "finished"),
            RaceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for RaceStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(RaceStatus::Open),
            "in_progress" => Ok(RaceStatus::InProgress),
            "finished" => Ok(RaceStatus::Finished),
            "cancelled" => Ok(RaceStatus::Cancelled),
            x => Err(UnknownVariant::new("race status", x)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Race {
    pub race_id: u32,
    pub identifier: String,
    pub connector: ConnectorId,
    pub game_id: u32,
    pub goal: String,
    pub status: RaceStatus,
    pub last_sync_at: NaiveDateTime,
    pub last_change_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRace {
    pub identifier: String,
    pub connector: ConnectorId,
    pub game_id: u32,
    pub goal: String,
    pub status: RaceStatus,
    pub last_sync_at: NaiveDateTime,
    pub last_change_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewRace {
    /// Goal, status and game come from the snapshot, identity never changes.
    /// Sync timestamps are carried over untouched here; they are settled by
    /// [`NewRace::touch`] once the entrant list has been reconciled.
    pub fn merge(
        existing: Option<&Race>,
        snapshot: &RaceSnapshot,
        connector: ConnectorId,
        game_id: u32,
        tick_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Self {
        let goal = snapshot
            .goal
            .as_deref()
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(NO_GOAL)
            .to_owned();

        match existing {
            Some(race) => {
                let unchanged = race.goal == goal
                    && race.status == snapshot.status
                    && race.game_id == game_id;
                NewRace {
                    identifier: race.identifier.clone(),
                    connector: race.connector,
                    game_id,
                    goal,
                    status: snapshot.status,
                    last_sync_at: race.last_sync_at,
                    last_change_at: race.last_change_at,
                    updated_at: if unchanged { race.updated_at } else { now },
                }
            }
            None => NewRace {
                identifier: snapshot.identifier.clone(),
                connector,
                game_id,
                goal,
                status: snapshot.status,
                last_sync_at: tick_at,
                last_change_at: tick_at,
                updated_at: now,
            },
        }
    }

    /// Records that a tick observed this race. `last_sync_at` never moves
    /// backwards and `last_change_at` only advances when `changed_at` is set.
    pub fn touch(
        race: &Race,
        synced_at: NaiveDateTime,
        changed_at: Option<NaiveDateTime>,
    ) -> Self {
        NewRace {
            identifier: race.identifier.clone(),
            connector: race.connector,
            game_id: race.game_id,
            goal: race.goal.clone(),
            status: race.status,
            last_sync_at: latest(race.last_sync_at, synced_at),
            last_change_at: match changed_at {
                Some(t) => latest(race.last_change_at, t),
                None => race.last_change_at,
            },
            updated_at: race.updated_at,
        }
    }
}
