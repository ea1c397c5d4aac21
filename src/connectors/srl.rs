use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{
    config::ConnectorConfig,
    connectors::{
        base_url, http_client, EntrantSnapshot, GameRef, GameSnapshot, ProviderConnector,
        RaceSnapshot,
    },
    error::ProviderError,
    models::{ConnectorId, EntrantStatus, RaceStatus},
};

const BASE_URL: &str = "https://api.speedrunslive.com/";

// SRL parks unfinished entrants at 9994+ instead of leaving the place empty
const PLACEHOLDER_PLACE: i64 = 9000;

#[derive(Debug, Deserialize)]
struct GameList {
    games: Vec<SrlGame>,
}

#[derive(Debug, Deserialize)]
struct SrlGame {
    name: String,
    abbrev: String,
}

#[derive(Debug, Deserialize)]
struct RaceList {
    races: Vec<SrlRace>,
}

#[derive(Debug, Deserialize)]
struct SrlRace {
    id: String,
    game: SrlGame,
    #[serde(default)]
    goal: String,
    state: u8,
    #[serde(default)]
    entrants: BTreeMap<String, SrlEntrant>,
}

#[derive(Debug, Deserialize)]
struct SrlEntrant {
    displayname: String,
    #[serde(default)]
    place: i64,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    statetext: String,
}

/// SpeedRunsLive. Games are identified by their abbreviation, which is what
/// race listings reference.
#[derive(Debug, Clone)]
pub struct SpeedRunsLiveConnector {
    client: Client,
    base: Url,
}

impl SpeedRunsLiveConnector {
    pub fn new(base: Option<&Url>) -> Result<Self, ProviderError> {
        Ok(SpeedRunsLiveConnector {
            client: http_client()?,
            base: base_url(base, BASE_URL)?,
        })
    }

    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ProviderError> {
        SpeedRunsLiveConnector::new(config.base_url.as_ref())
    }
}

#[async_trait]
impl ProviderConnector for SpeedRunsLiveConnector {
    fn connector_id(&self) -> ConnectorId {
        ConnectorId::SpeedRunsLive
    }

    async fn list_games(&self) -> Result<Vec<GameSnapshot>, ProviderError> {
        let list: GameList = self
            .client
            .get(self.base.join("games")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(list
            .games
            .into_iter()
            .map(|g| GameSnapshot {
                identifier: g.abbrev,
                name: g.name,
                image_url: None,
            })
            .collect())
    }

    async fn active_races(&self) -> Result<Vec<RaceSnapshot>, ProviderError> {
        let list: RaceList = self
            .client
            .get(self.base.join("races")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut races = Vec::with_capacity(list.races.len());
        for race in list.races {
            let id = race.id.clone();
            match race.into_snapshot() {
                Ok(r) => races.push(r),
                Err(e) => warn!("Skipping SRL race \"{}\": {}", id, e),
            }
        }

        Ok(races)
    }
}

impl SrlRace {
    fn into_snapshot(self) -> Result<RaceSnapshot, ProviderError> {
        let status = match self.state {
            1 | 2 => RaceStatus::Open,
            3 => RaceStatus::InProgress,
            4 | 5 => RaceStatus::Finished,
            x => {
                return Err(ProviderError::Malformed(format!(
                    "unknown SRL race state {} on race {}",
                    x, self.id
                )))
            }
        };

        let mut entrants: Vec<EntrantSnapshot> = self
            .entrants
            .into_values()
            .map(|e| e.into_snapshot(status))
            .collect();
        entrants.sort_by(|a, b| {
            a.place
                .unwrap_or(u32::MAX)
                .cmp(&b.place.unwrap_or(u32::MAX))
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        Ok(RaceSnapshot {
            identifier: self.id,
            game: GameRef {
                identifier: self.game.abbrev,
                name: self.game.name,
            },
            goal: Some(self.goal).filter(|g| !g.is_empty()),
            status,
            entrants,
        })
    }
}

impl SrlEntrant {
    fn into_snapshot(self, race_status: RaceStatus) -> EntrantSnapshot {
        let status = match self.statetext.as_str() {
            "Ready" if race_status == RaceStatus::InProgress => EntrantStatus::InProgress,
            "Ready" => EntrantStatus::Ready,
            "Finished" => EntrantStatus::Done,
            "Forfeit" => EntrantStatus::Forfeit,
            "Disqualified" => EntrantStatus::Disqualified,
            _ => EntrantStatus::Entered,
        };
        let place = match self.place {
            p if p > 0 && p < PLACEHOLDER_PLACE => Some(p as u32),
            _ => None,
        };
        let final_time = match self.time {
            t if t > 0 && status == EntrantStatus::Done => Some(t as u32),
            _ => None,
        };

        EntrantSnapshot {
            display_name: self.displayname,
            status,
            final_time,
            place,
        }
    }
}
