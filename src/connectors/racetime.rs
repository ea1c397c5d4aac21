use async_trait::async_trait;
use futures::future::join_all;
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

const BASE_URL: &str = "https://racetime.gg/";

#[derive(Debug, Deserialize)]
struct CategoryList {
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    name: String,
    slug: String,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RaceList {
    races: Vec<RaceSummary>,
}

#[derive(Debug, Deserialize)]
struct RaceSummary {
    name: String,
    #[serde(default)]
    data_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RaceDetail {
    name: String,
    status: StatusValue,
    #[serde(default)]
    goal: Option<Goal>,
    category: Category,
    #[serde(default)]
    entrants: Vec<RaceEntrant>,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct Goal {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RaceEntrant {
    user: User,
    status: StatusValue,
    #[serde(default)]
    finish_time: Option<String>,
    #[serde(default)]
    place: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct User {
    name: String,
}

/// racetime.gg. Categories are games; a race's entrants are only listed on
/// its own data endpoint so every active race costs one extra request.
#[derive(Debug, Clone)]
pub struct RaceTimeConnector {
    client: Client,
    base: Url,
}

impl RaceTimeConnector {
    pub fn new(base: Option<&Url>) -> Result<Self, ProviderError> {
        Ok(RaceTimeConnector {
            client: http_client()?,
            base: base_url(base, BASE_URL)?,
        })
    }

    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ProviderError> {
        RaceTimeConnector::new(config.base_url.as_ref())
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, ProviderError> {
        let payload = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?;

        Ok(payload)
    }

    async fn race_detail(&self, summary: &RaceSummary) -> Result<RaceSnapshot, ProviderError> {
        let path = match &summary.data_url {
            Some(p) => p.clone(),
            None => format!("{}/data", summary.name),
        };
        let url = self.base.join(path.trim_start_matches('/'))?;
        let detail: RaceDetail = self.get(url).await?;

        detail.into_snapshot()
    }
}

impl RaceDetail {
    fn into_snapshot(self) -> Result<RaceSnapshot, ProviderError> {
        let status = race_status(&self.status.value)?;
        let mut entrants = Vec::with_capacity(self.entrants.len());
        for e in self.entrants {
            entrants.push(EntrantSnapshot {
                status: entrant_status(&e.status.value)?,
                final_time: e.finish_time.as_deref().and_then(parse_finish_time),
                place: e.place,
                display_name: e.user.name,
            });
        }

        Ok(RaceSnapshot {
            identifier: self.name,
            game: GameRef {
                identifier: self.category.slug,
                name: self.category.name,
            },
            goal: self.goal.map(|g| g.name),
            status,
            entrants,
        })
    }
}

#[async_trait]
impl ProviderConnector for RaceTimeConnector {
    fn connector_id(&self) -> ConnectorId {
        ConnectorId::RaceTimeGg
    }

    async fn list_games(&self) -> Result<Vec<GameSnapshot>, ProviderError> {
        let list: CategoryList = self.get(self.base.join("categories/data")?).await?;
        let games = list
            .categories
            .into_iter()
            .map(|c| GameSnapshot {
                identifier: c.slug,
                name: c.name,
                image_url: c.image.filter(|i| !i.is_empty()),
            })
            .collect();

        Ok(games)
    }

    async fn active_races(&self) -> Result<Vec<RaceSnapshot>, ProviderError> {
        let list: RaceList = self.get(self.base.join("races/data")?).await?;
        let details = join_all(list.races.iter().map(|r| self.race_detail(r))).await;

        // one broken race shouldn't hide every other race from this tick
        let mut races = Vec::with_capacity(details.len());
        for (summary, detail) in list.races.iter().zip(details) {
            match detail {
                Ok(r) => races.push(r),
                Err(e) => warn!("Error loading racetime.gg race \"{}\": {}", summary.name, e),
            }
        }

        Ok(races)
    }
}

fn race_status(value: &str) -> Result<RaceStatus, ProviderError> {
    match value {
        "open" | "invitational" => Ok(RaceStatus::Open),
        "pending" | "in_progress" => Ok(RaceStatus::InProgress),
        "finished" => Ok(RaceStatus::Finished),
        "cancelled" => Ok(RaceStatus::Cancelled),
        x => Err(ProviderError::Malformed(format!(
            "unknown racetime.gg race status \"{}\"",
            x
        ))),
    }
}

fn entrant_status(value: &str) -> Result<EntrantStatus, ProviderError> {
    match value {
        "requested" | "invited" | "declined" | "not_ready" => Ok(EntrantStatus::Entered),
        "ready" => Ok(EntrantStatus::Ready),
        "in_progress" => Ok(EntrantStatus::InProgress),
        "done" => Ok(EntrantStatus::Done),
        "dnf" => Ok(EntrantStatus::Forfeit),
        "dq" => Ok(EntrantStatus::Disqualified),
        x => Err(ProviderError::Malformed(format!(
            "unknown racetime.gg entrant status \"{}\"",
            x
        ))),
    }
}

/// Parses racetime.gg's ISO 8601 durations (`P0DT01H23M45.678901S`) into
/// whole seconds.
pub fn parse_finish_time(value: &str) -> Option<u32> {
    let rest = value.strip_prefix('P')?;
    let (days, time) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut seconds = 0f64;
    if !days.is_empty() {
        seconds += days.strip_suffix('D')?.parse::<f64>().ok()? * 86400f64;
    }
    let mut number = String::with_capacity(12);
    for c in time.chars() {
        let unit = match c {
            '0'..='9' | '.' => {
                number.push(c);
                continue;
            }
            'H' => 3600f64,
            'M' => 60f64,
            'S' => 1f64,
            _ => return None,
        };
        seconds += number.parse::<f64>().ok()? * unit;
        number.clear();
    }
    if !number.is_empty() || seconds < 0f64 {
        return None;
    }

    Some(seconds.trunc() as u32)
}
