use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::{
    mysql::MysqlConnection,
    prelude::*,
    r2d2::{ConnectionManager, Pool, PoolError, PooledConnection},
};
use tokio::task;

use crate::{
    error::StoreError,
    models::{
        Channel, ConnectorId, Entrant, EntrantDetail, Game, NewChannel, NewEntrant, NewGame,
        NewRace, NewRacer, NewTracker, Race, Racer, Tracker,
    },
    schema::{channels, entrants, games, racers, races, trackers},
    store::{EntityStore, StoreResult},
};

pub type MysqlPool = Pool<ConnectionManager<MysqlConnection>>;
pub type PooledConn = PooledConnection<ConnectionManager<MysqlConnection>>;

pub fn get_pool(database_url: &str) -> StoreResult<MysqlPool> {
    let manager = ConnectionManager::<MysqlConnection>::new(database_url);
    let pool = Pool::builder().build(manager)?;

    Ok(pool)
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

#[derive(Debug, Queryable)]
struct GameRow {
    game_id: u32,
    identifier: String,
    connector: String,
    name: String,
    image_url: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<GameRow> for Game {
    type Error = StoreError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        Ok(Game {
            game_id: row.game_id,
            identifier: row.identifier,
            connector: row.connector.parse()?,
            name: row.name,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Queryable)]
struct RacerRow {
    racer_id: u32,
    identifier: String,
    connector: String,
    display_name: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<RacerRow> for Racer {
    type Error = StoreError;

    fn try_from(row: RacerRow) -> Result<Self, Self::Error> {
        Ok(Racer {
            racer_id: row.racer_id,
            identifier: row.identifier,
            connector: row.connector.parse()?,
            display_name: row.display_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Queryable)]
struct RaceRow {
    race_id: u32,
    identifier: String,
    connector: String,
    game_id: u32,
    goal: String,
    status: String,
    last_sync_at: NaiveDateTime,
    last_change_at: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<RaceRow> for Race {
    type Error = StoreError;

    fn try_from(row: RaceRow) -> Result<Self, Self::Error> {
        Ok(Race {
            race_id: row.race_id,
            identifier: row.identifier,
            connector: row.connector.parse()?,
            game_id: row.game_id,
            goal: row.goal,
            status: row.status.parse()?,
            last_sync_at: row.last_sync_at,
            last_change_at: row.last_change_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Queryable)]
struct EntrantRow {
    entrant_id: u32,
    race_id: u32,
    racer_id: u32,
    status: String,
    final_time: Option<u32>,
    place: Option<u32>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<EntrantRow> for Entrant {
    type Error = StoreError;

    fn try_from(row: EntrantRow) -> Result<Self, Self::Error> {
        Ok(Entrant {
            entrant_id: row.entrant_id,
            race_id: row.race_id,
            racer_id: row.racer_id,
            status: row.status.parse()?,
            final_time: row.final_time,
            place: row.place,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Queryable)]
struct ChannelRow {
    channel_id: u32,
    identifier: String,
    server_identifier: Option<String>,
    name: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<ChannelRow> for Channel {
    fn from(row: ChannelRow) -> Self {
        Channel {
            channel_id: row.channel_id,
            identifier: row.identifier,
            server_identifier: row.server_identifier,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Queryable)]
struct TrackerRow {
    tracker_id: u32,
    identifier: String,
    channel_id: u32,
    game_id: u32,
    is_active: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<TrackerRow> for Tracker {
    fn from(row: TrackerRow) -> Self {
        Tracker {
            tracker_id: row.tracker_id,
            identifier: row.identifier,
            channel_id: row.channel_id,
            game_id: row.game_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Diesel backed store. Every query runs on the blocking pool with its own
/// pooled connection; upserts run inside a transaction.
#[derive(Clone)]
pub struct MysqlStore {
    pool: MysqlPool,
}

impl MysqlStore {
    pub fn new(pool: MysqlPool) -> Self {
        MysqlStore { pool }
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&MysqlConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn: PooledConn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl EntityStore for MysqlStore {
    async fn find_game(
        &self,
        connector: ConnectorId,
        identifier: &str,
    ) -> StoreResult<Option<Game>> {
        let identifier = identifier.to_owned();
        self.run(move |conn| {
            games::table
                .filter(games::connector.eq(connector.to_string()))
                .filter(games::identifier.eq(identifier))
                .first::<GameRow>(conn)
                .optional()?
                .map(Game::try_from)
                .transpose()
        })
        .await
    }

    async fn save_game(&self, game: NewGame) -> StoreResult<Game> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|| {
                let connector = game.connector.to_string();
                let by_key = games::table
                    .filter(games::connector.eq(&connector))
                    .filter(games::identifier.eq(&game.identifier));
                match by_key
                    .clone()
                    .select(games::game_id)
                    .first::<u32>(conn)
                    .optional()?
                {
                    Some(game_id) => {
                        diesel::update(games::table.find(game_id))
                            .set((
                                games::name.eq(&game.name),
                                games::image_url.eq(&game.image_url),
                                games::updated_at.eq(game.updated_at),
                            ))
                            .execute(conn)?;
                    }
                    None => {
                        diesel::insert_into(games::table)
                            .values((
                                games::identifier.eq(&game.identifier),
                                games::connector.eq(&connector),
                                games::name.eq(&game.name),
                                games::image_url.eq(&game.image_url),
                                games::created_at.eq(game.updated_at),
                                games::updated_at.eq(game.updated_at),
                            ))
                            .execute(conn)?;
                    }
                }

                by_key.first::<GameRow>(conn)?.try_into()
            })
        })
        .await
    }

    async fn find_racer(
        &self,
        connector: ConnectorId,
        identifier: &str,
    ) -> StoreResult<Option<Racer>> {
        let identifier = identifier.to_owned();
        self.run(move |conn| {
            racers::table
                .filter(racers::connector.eq(connector.to_string()))
                .filter(racers::identifier.eq(identifier))
                .first::<RacerRow>(conn)
                .optional()?
                .map(Racer::try_from)
                .transpose()
        })
        .await
    }

    async fn save_racer(&self, racer: NewRacer) -> StoreResult<Racer> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|| {
                let connector = racer.connector.to_string();
                let by_key = racers::table
                    .filter(racers::connector.eq(&connector))
                    .filter(racers::identifier.eq(&racer.identifier));
                match by_key
                    .clone()
                    .select(racers::racer_id)
                    .first::<u32>(conn)
                    .optional()?
                {
                    Some(racer_id) => {
                        diesel::update(racers::table.find(racer_id))
                            .set((
                                racers::display_name.eq(&racer.display_name),
                                racers::updated_at.eq(racer.updated_at),
                            ))
                            .execute(conn)?;
                    }
                    None => {
                        diesel::insert_into(racers::table)
                            .values((
                                racers::identifier.eq(&racer.identifier),
                                racers::connector.eq(&connector),
                                racers::display_name.eq(&racer.display_name),
                                racers::created_at.eq(racer.updated_at),
                                racers::updated_at.eq(racer.updated_at),
                            ))
                            .execute(conn)?;
                    }
                }

                by_key.first::<RacerRow>(conn)?.try_into()
            })
        })
        .await
    }

    async fn find_race(
        &self,
        connector: ConnectorId,
        identifier: &str,
    ) -> StoreResult<Option<Race>> {
        let identifier = identifier.to_owned();
        self.run(move |conn| {
            races::table
                .filter(races::connector.eq(connector.to_string()))
                .filter(races::identifier.eq(identifier))
                .first::<RaceRow>(conn)
                .optional()?
                .map(Race::try_from)
                .transpose()
        })
        .await
    }

    async fn save_race(&self, race: NewRace) -> StoreResult<Race> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|| {
                let connector = race.connector.to_string();
                let status = race.status.to_string();
                let by_key = races::table
                    .filter(races::connector.eq(&connector))
                    .filter(races::identifier.eq(&race.identifier));
                match by_key
                    .clone()
                    .select(races::race_id)
                    .first::<u32>(conn)
                    .optional()?
                {
                    Some(race_id) => {
                        diesel::update(races::table.find(race_id))
                            .set((
                                races::game_id.eq(race.game_id),
                                races::goal.eq(&race.goal),
                                races::status.eq(&status),
                                races::last_sync_at.eq(race.last_sync_at),
                                races::last_change_at.eq(race.last_change_at),
                                races::updated_at.eq(race.updated_at),
                            ))
                            .execute(conn)?;
                    }
                    None => {
                        diesel::insert_into(races::table)
                            .values((
                                races::identifier.eq(&race.identifier),
                                races::connector.eq(&connector),
                                races::game_id.eq(race.game_id),
                                races::goal.eq(&race.goal),
                                races::status.eq(&status),
                                races::last_sync_at.eq(race.last_sync_at),
                                races::last_change_at.eq(race.last_change_at),
                                races::created_at.eq(race.updated_at),
                                races::updated_at.eq(race.updated_at),
                            ))
                            .execute(conn)?;
                    }
                }

                by_key.first::<RaceRow>(conn)?.try_into()
            })
        })
        .await
    }

    async fn find_entrants(&self, race_id: u32) -> StoreResult<Vec<EntrantDetail>> {
        self.run(move |conn| {
            entrants::table
                .inner_join(racers::table)
                .filter(entrants::race_id.eq(race_id))
                .order(entrants::entrant_id.asc())
                .load::<(EntrantRow, RacerRow)>(conn)?
                .into_iter()
                .map(|(entrant, racer)| -> StoreResult<EntrantDetail> {
                    Ok(EntrantDetail {
                        entrant: entrant.try_into()?,
                        racer: racer.try_into()?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn save_entrant(&self, entrant: NewEntrant) -> StoreResult<Entrant> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|| {
                let race = races::table
                    .find(entrant.race_id)
                    .select(races::race_id)
                    .first::<u32>(conn)
                    .optional()?;
                if race.is_none() {
                    return Err(StoreError::missing("race", entrant.race_id));
                }
                let racer = racers::table
                    .find(entrant.racer_id)
                    .select(racers::racer_id)
                    .first::<u32>(conn)
                    .optional()?;
                if racer.is_none() {
                    return Err(StoreError::missing("racer", entrant.racer_id));
                }

                let status = entrant.status.to_string();
                let by_key = entrants::table
                    .filter(entrants::race_id.eq(entrant.race_id))
                    .filter(entrants::racer_id.eq(entrant.racer_id));
                match by_key
                    .clone()
                    .select(entrants::entrant_id)
                    .first::<u32>(conn)
                    .optional()?
                {
                    Some(entrant_id) => {
                        diesel::update(entrants::table.find(entrant_id))
                            .set((
                                entrants::status.eq(&status),
                                entrants::final_time.eq(entrant.final_time),
                                entrants::place.eq(entrant.place),
                                entrants::updated_at.eq(entrant.updated_at),
                            ))
                            .execute(conn)?;
                    }
                    None => {
                        diesel::insert_into(entrants::table)
                            .values((
                                entrants::race_id.eq(entrant.race_id),
                                entrants::racer_id.eq(entrant.racer_id),
                                entrants::status.eq(&status),
                                entrants::final_time.eq(entrant.final_time),
                                entrants::place.eq(entrant.place),
                                entrants::created_at.eq(entrant.updated_at),
                                entrants::updated_at.eq(entrant.updated_at),
                            ))
                            .execute(conn)?;
                    }
                }

                by_key.first::<EntrantRow>(conn)?.try_into()
            })
        })
        .await
    }

    async fn delete_entrants(&self, race_id: u32, entrant_ids: &[u32]) -> StoreResult<usize> {
        let entrant_ids = entrant_ids.to_vec();
        self.run(move |conn| {
            let removed = diesel::delete(
                entrants::table
                    .filter(entrants::race_id.eq(race_id))
                    .filter(entrants::entrant_id.eq_any(entrant_ids)),
            )
            .execute(conn)?;

            Ok(removed)
        })
        .await
    }

    async fn find_channel(&self, identifier: &str) -> StoreResult<Option<Channel>> {
        let identifier = identifier.to_owned();
        self.run(move |conn| {
            let row = channels::table
                .filter(channels::identifier.eq(identifier))
                .first::<ChannelRow>(conn)
                .optional()?;

            Ok(row.map(Channel::from))
        })
        .await
    }

    async fn find_channels_by_server(&self, server_identifier: &str) -> StoreResult<Vec<Channel>> {
        let server_identifier = server_identifier.to_owned();
        self.run(move |conn| {
            let rows = channels::table
                .filter(channels::server_identifier.eq(server_identifier))
                .load::<ChannelRow>(conn)?;

            Ok(rows.into_iter().map(Channel::from).collect())
        })
        .await
    }

    async fn save_channel(&self, channel: NewChannel) -> StoreResult<Channel> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|| {
                let by_key = channels::table.filter(channels::identifier.eq(&channel.identifier));
                match by_key
                    .clone()
                    .select(channels::channel_id)
                    .first::<u32>(conn)
                    .optional()?
                {
                    Some(channel_id) => {
                        diesel::update(channels::table.find(channel_id))
                            .set((
                                channels::server_identifier.eq(&channel.server_identifier),
                                channels::name.eq(&channel.name),
                                channels::updated_at.eq(channel.updated_at),
                            ))
                            .execute(conn)?;
                    }
                    None => {
                        diesel::insert_into(channels::table)
                            .values((
                                channels::identifier.eq(&channel.identifier),
                                channels::server_identifier.eq(&channel.server_identifier),
                                channels::name.eq(&channel.name),
                                channels::created_at.eq(channel.updated_at),
                                channels::updated_at.eq(channel.updated_at),
                            ))
                            .execute(conn)?;
                    }
                }

                Ok(by_key.first::<ChannelRow>(conn)?.into())
            })
        })
        .await
    }

    async fn find_tracker(&self, channel_id: u32, game_id: u32) -> StoreResult<Option<Tracker>> {
        self.run(move |conn| {
            let row = trackers::table
                .filter(trackers::channel_id.eq(channel_id))
                .filter(trackers::game_id.eq(game_id))
                .first::<TrackerRow>(conn)
                .optional()?;

            Ok(row.map(Tracker::from))
        })
        .await
    }

    async fn find_tracker_by_id(&self, tracker_id: u32) -> StoreResult<Option<Tracker>> {
        self.run(move |conn| {
            let row = trackers::table
                .find(tracker_id)
                .first::<TrackerRow>(conn)
                .optional()?;

            Ok(row.map(Tracker::from))
        })
        .await
    }

    async fn find_trackers_by_channels(&self, channel_ids: &[u32]) -> StoreResult<Vec<Tracker>> {
        let channel_ids = channel_ids.to_vec();
        self.run(move |conn| {
            let rows = trackers::table
                .filter(trackers::channel_id.eq_any(channel_ids))
                .order(trackers::tracker_id.asc())
                .load::<TrackerRow>(conn)?;

            Ok(rows.into_iter().map(Tracker::from).collect())
        })
        .await
    }

    async fn find_trackers_by_game(&self, game_id: u32) -> StoreResult<Vec<Tracker>> {
        self.run(move |conn| {
            let rows = trackers::table
                .filter(trackers::game_id.eq(game_id))
                .order(trackers::tracker_id.asc())
                .load::<TrackerRow>(conn)?;

            Ok(rows.into_iter().map(Tracker::from).collect())
        })
        .await
    }

    async fn save_tracker(&self, tracker: NewTracker) -> StoreResult<Tracker> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|| {
                let by_key = trackers::table
                    .filter(trackers::channel_id.eq(tracker.channel_id))
                    .filter(trackers::game_id.eq(tracker.game_id));
                match by_key
                    .clone()
                    .select(trackers::tracker_id)
                    .first::<u32>(conn)
                    .optional()?
                {
                    Some(tracker_id) => {
                        diesel::update(trackers::table.find(tracker_id))
                            .set((
                                trackers::is_active.eq(tracker.is_active),
                                trackers::updated_at.eq(tracker.updated_at),
                            ))
                            .execute(conn)?;
                    }
                    None => {
                        diesel::insert_into(trackers::table)
                            .values((
                                trackers::identifier.eq(&tracker.identifier),
                                trackers::channel_id.eq(tracker.channel_id),
                                trackers::game_id.eq(tracker.game_id),
                                trackers::is_active.eq(tracker.is_active),
                                trackers::created_at.eq(tracker.updated_at),
                                trackers::updated_at.eq(tracker.updated_at),
                            ))
                            .execute(conn)?;
                    }
                }

                Ok(by_key.first::<TrackerRow>(conn)?.into())
            })
        })
        .await
    }
}
