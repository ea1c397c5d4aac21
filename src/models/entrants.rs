use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    connectors::EntrantSnapshot,
    error::UnknownVariant,
    models::racers::Racer,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrantStatus {
    Entered,
    Ready,
    InProgress,
    Done,
    Forfeit,
    Disqualified,
}

impl fmt::Display for EntrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EntrantStatus::Entered => write!(f, "entered"),
            EntrantStatus::Ready => write!(f, "ready"),
            EntrantStatus::InProgress => write!(f, "in_progress"),
            EntrantStatus::Done => write!(f, "done"),
            EntrantStatus::Forfeit => write!(f, "forfeit"),
            EntrantStatus::Disqualified => write!(f, "disqualified"),
        }
    }
}

impl FromStr for EntrantStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entered" => Ok(EntrantStatus::Entered),
            "ready" => Ok(EntrantStatus::Ready),
            "in_progress" => Ok(EntrantStatus::InProgress),
            "done" => Ok(EntrantStatus::Done),
            "forfeit" => Ok(EntrantStatus::Forfeit),
            "disqualified" => Ok(EntrantStatus::Disqualified),
            x => Err(UnknownVariant::new("entrant status", x)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entrant {
    pub entrant_id: u32,
    pub race_id: u32,
    pub racer_id: u32,
    pub status: EntrantStatus,
    // whole seconds
    pub final_time: Option<u32>,
    pub place: Option<u32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntrant {
    pub race_id: u32,
    pub racer_id: u32,
    pub status: EntrantStatus,
    pub final_time: Option<u32>,
    pub place: Option<u32>,
    pub updated_at: NaiveDateTime,
}

impl NewEntrant {
    pub fn merge(
        existing: Option<&Entrant>,
        race_id: u32,
        racer_id: u32,
        snapshot: &EntrantSnapshot,
        now: NaiveDateTime,
    ) -> Self {
        let updated_at = match existing {
            Some(e)
                if e.status == snapshot.status
                    && e.final_time == snapshot.final_time
                    && e.place == snapshot.place =>
            {
                e.updated_at
            }
            _ => now,
        };

        NewEntrant {
            race_id,
            racer_id,
            status: snapshot.status,
            final_time: snapshot.final_time,
            place: snapshot.place,
            updated_at,
        }
    }
}

/// An entrant joined with the racer it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrantDetail {
    pub entrant: Entrant,
    pub racer: Racer,
}
