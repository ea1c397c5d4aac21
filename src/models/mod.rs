use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

pub mod entrants;
pub mod games;
pub mod racers;
pub mod races;
pub mod trackers;

pub use entrants::{Entrant, EntrantDetail, EntrantStatus, NewEntrant};
pub use games::{Game, NewGame};
pub use racers::{NewRacer, Racer};
pub use races::{NewRace, Race, RaceStatus};
pub use trackers::{Channel, NewChannel, NewTracker, Tracker};

/// The race source a record was synchronized from. Every natural key in the
/// store is scoped by one of these.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorId {
    #[serde(rename = "RTGG")]
    RaceTimeGg,
    #[serde(rename = "SRL")]
    SpeedRunsLive,
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConnectorId::RaceTimeGg => write!(f, "RTGG"),
            ConnectorId::SpeedRunsLive => write!(f, "SRL"),
        }
    }
}

impl FromStr for ConnectorId {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RTGG" => Ok(ConnectorId::RaceTimeGg),
            "SRL" => Ok(ConnectorId::SpeedRunsLive),
            x => Err(UnknownVariant::new("connector", x)),
        }
    }
}
