mod common;

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;

use common::{entrant, finished, game, race, step_clock, RecordingSink, ScriptedConnector};
use race_announcer::{
    error::{StoreError, SyncError},
    events::ChangeFeed,
    models::{
        Channel, ConnectorId, Entrant, EntrantDetail, EntrantStatus, Game, NewChannel, NewEntrant,
        NewGame, NewRace, NewRacer, NewTracker, Race, RaceStatus, Racer, Tracker,
    },
    store::{EntityStore, MemoryStore, StoreResult},
    sync::{GameCatalogSync, RaceSync, RaceTickReport},
};

const RTGG: ConnectorId = ConnectorId::RaceTimeGg;

struct Harness {
    connector: Arc<ScriptedConnector>,
    store: Arc<MemoryStore>,
    sink: Arc<RecordingSink>,
    sync: RaceSync,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    harness_with(Arc::clone(&store) as Arc<dyn EntityStore>, store).await
}

async fn harness_with(store: Arc<dyn EntityStore>, memory: Arc<MemoryStore>) -> Harness {
    let clock = step_clock();
    let connector = ScriptedConnector::new(RTGG);
    connector.set_games(vec![
        game("alttpr", "A Link to the Past Randomizer"),
        game("smw", "Super Mario World"),
    ]);
    GameCatalogSync::new(connector.clone(), Arc::clone(&store))
        .with_clock(Arc::clone(&clock))
        .tick()
        .await
        .unwrap();

    let feed = Arc::new(ChangeFeed::new());
    let sink = RecordingSink::new();
    feed.subscribe(sink.clone()).await;
    let sync = RaceSync::new(connector.clone(), store, feed).with_clock(clock);

    Harness {
        connector,
        store: memory,
        sink,
        sync,
    }
}

impl Harness {
    async fn race(&self, identifier: &str) -> Race {
        self.store
            .find_race(RTGG, identifier)
            .await
            .unwrap()
            .expect("race should be stored")
    }

    async fn entrants(&self, identifier: &str) -> Vec<EntrantDetail> {
        let race = self.race(identifier).await;
        self.store.find_entrants(race.race_id).await.unwrap()
    }

    async fn racer_names(&self, identifier: &str) -> BTreeSet<String> {
        self.entrants(identifier)
            .await
            .into_iter()
            .map(|d| d.racer.identifier)
            .collect()
    }
}

fn report(fetched: usize, changed: usize, unchanged: usize) -> RaceTickReport {
    RaceTickReport {
        fetched,
        changed,
        unchanged,
        skipped: 0,
        failed: 0,
    }
}

#[tokio::test]
async fn scenario_new_race_then_finish_then_quiet() {
    let h = harness().await;
    let r1 = "alttpr/lazy-bonk-0001";

    // tick 1: a new race with two entrants
    h.connector.set_races(vec![race(
        r1,
        "alttpr",
        RaceStatus::InProgress,
        vec![
            entrant("Alice", EntrantStatus::InProgress),
            entrant("Bob", EntrantStatus::InProgress),
        ],
    )]);
    assert_eq!(h.sync.tick().await.unwrap(), report(1, 1, 0));

    let stored = h.race(r1).await;
    assert_eq!(stored.status, RaceStatus::InProgress);
    assert_eq!(h.store.racers().await.len(), 2);
    assert_eq!(
        h.racer_names(r1).await,
        BTreeSet::from(["alice".to_owned(), "bob".to_owned()])
    );
    let changes = h.sink.take().await;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].race.identifier, r1);
    assert_eq!(changes[0].game.identifier, "alttpr");
    assert_eq!(changes[0].entrants.len(), 2);

    // tick 2: race finished, Bob left
    h.connector.set_races(vec![race(
        r1,
        "alttpr",
        RaceStatus::Finished,
        vec![finished("Alice", 120, 1)],
    )]);
    assert_eq!(h.sync.tick().await.unwrap(), report(1, 1, 0));

    let after_finish = h.race(r1).await;
    assert_eq!(after_finish.race_id, stored.race_id);
    assert_eq!(after_finish.status, RaceStatus::Finished);
    let entrants = h.entrants(r1).await;
    assert_eq!(entrants.len(), 1);
    assert_eq!(entrants[0].racer.display_name, "Alice");
    assert_eq!(entrants[0].entrant.status, EntrantStatus::Done);
    assert_eq!(entrants[0].entrant.final_time, Some(120));
    assert_eq!(entrants[0].entrant.place, Some(1));
    let changes = h.sink.take().await;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].race.status, RaceStatus::Finished);
    assert_eq!(changes[0].entrants.len(), 1);

    // tick 3: nothing moved
    assert_eq!(h.sync.tick().await.unwrap(), report(1, 0, 1));

    let quiet = h.race(r1).await;
    assert_eq!(h.sink.count().await, 0);
    assert_eq!(quiet.last_change_at, after_finish.last_change_at);
    assert!(quiet.last_sync_at > after_finish.last_sync_at);
    assert_eq!(quiet.updated_at, after_finish.updated_at);
}

#[tokio::test]
async fn unchanged_snapshot_is_idempotent() {
    let h = harness().await;
    let snapshot = race(
        "smw/sneaky-wiggler-1234",
        "smw",
        RaceStatus::Open,
        vec![
            entrant("Alice", EntrantStatus::Ready),
            entrant("Bob", EntrantStatus::Entered),
        ],
    );
    h.connector.set_races(vec![snapshot]);
    h.sync.tick().await.unwrap();
    h.sink.take().await;

    let before = h.race("smw/sneaky-wiggler-1234").await;
    let entrants_before = h.entrants("smw/sneaky-wiggler-1234").await;
    for _ in 0..3 {
        assert_eq!(h.sync.tick().await.unwrap(), report(1, 0, 1));
    }

    let after = h.race("smw/sneaky-wiggler-1234").await;
    assert_eq!(h.entrants("smw/sneaky-wiggler-1234").await, entrants_before);
    assert_eq!(after.last_change_at, before.last_change_at);
    assert!(after.last_sync_at > before.last_sync_at);
    assert_eq!(h.store.entrant_count().await, 2);
    assert_eq!(h.sink.count().await, 0);
}

#[tokio::test]
async fn entrants_converge_on_latest_snapshot() {
    let h = harness().await;
    let id = "alttpr/quick-ganon-0002";
    let rounds = [
        vec!["Alice", "Bob", "Carol"],
        vec!["Carol", "Dave"],
        vec!["Dave"],
        vec!["Erin", "Alice"],
    ];

    for names in rounds.iter() {
        let entrants = names
            .iter()
            .map(|n| entrant(n, EntrantStatus::Ready))
            .collect();
        h.connector
            .set_races(vec![race(id, "alttpr", RaceStatus::Open, entrants)]);
        h.sync.tick().await.unwrap();

        let expected: BTreeSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
        assert_eq!(h.racer_names(id).await, expected);
    }
    assert_eq!(h.store.entrant_count().await, 2);
}

#[tokio::test]
async fn any_single_entrant_change_is_detected() {
    let h = harness().await;
    let id = "alttpr/quick-ganon-0003";
    let mut entrants = vec![
        entrant("Alice", EntrantStatus::InProgress),
        entrant("Bob", EntrantStatus::InProgress),
    ];
    h.connector.set_races(vec![race(
        id,
        "alttpr",
        RaceStatus::InProgress,
        entrants.clone(),
    )]);
    h.sync.tick().await.unwrap();
    h.sink.take().await;

    entrants[1].place = Some(1);
    h.connector.set_races(vec![race(
        id,
        "alttpr",
        RaceStatus::InProgress,
        entrants.clone(),
    )]);
    assert_eq!(h.sync.tick().await.unwrap().changed, 1);

    entrants[1].final_time = Some(3600);
    h.connector.set_races(vec![race(
        id,
        "alttpr",
        RaceStatus::InProgress,
        entrants.clone(),
    )]);
    assert_eq!(h.sync.tick().await.unwrap().changed, 1);

    entrants[0].status = EntrantStatus::Forfeit;
    h.connector.set_races(vec![race(
        id,
        "alttpr",
        RaceStatus::InProgress,
        entrants.clone(),
    )]);
    assert_eq!(h.sync.tick().await.unwrap().changed, 1);

    assert_eq!(h.sink.take().await.len(), 3);
}

#[tokio::test]
async fn goal_change_is_a_race_change() {
    let h = harness().await;
    let id = "smw/sneaky-wiggler-0004";
    let mut snapshot = race(id, "smw", RaceStatus::Open, vec![entrant("Alice", EntrantStatus::Entered)]);
    h.connector.set_races(vec![snapshot.clone()]);
    h.sync.tick().await.unwrap();
    let before = h.race(id).await;

    snapshot.goal = Some("96 Exit".to_owned());
    h.connector.set_races(vec![snapshot.clone()]);
    assert_eq!(h.sync.tick().await.unwrap().changed, 1);
    let after = h.race(id).await;
    assert_eq!(after.goal, "96 Exit");
    assert!(after.last_change_at > before.last_change_at);

    snapshot.goal = None;
    h.connector.set_races(vec![snapshot]);
    assert_eq!(h.sync.tick().await.unwrap().changed, 1);
    assert_eq!(h.race(id).await.goal, "-");
}

#[tokio::test]
async fn racer_names_collapse_case_insensitively() {
    let h = harness().await;
    let id = "alttpr/lazy-bonk-0005";
    h.connector.set_races(vec![race(
        id,
        "alttpr",
        RaceStatus::Open,
        vec![
            entrant("Foo", EntrantStatus::Entered),
            entrant("foo", EntrantStatus::Ready),
        ],
    )]);
    h.sync.tick().await.unwrap();

    let racers = h.store.racers().await;
    assert_eq!(racers.len(), 1);
    assert_eq!(racers[0].identifier, "foo");
    assert_eq!(racers[0].display_name, "foo");
    let entrants = h.entrants(id).await;
    assert_eq!(entrants.len(), 1);
    assert_eq!(entrants[0].entrant.status, EntrantStatus::Ready);

    // the collapsed count is what gets compared next tick
    assert_eq!(h.sync.tick().await.unwrap(), report(1, 0, 1));
}

#[tokio::test]
async fn display_name_case_follows_provider() {
    let h = harness().await;
    let id = "alttpr/lazy-bonk-0006";
    h.connector.set_races(vec![race(
        id,
        "alttpr",
        RaceStatus::Open,
        vec![entrant("alice", EntrantStatus::Entered)],
    )]);
    h.sync.tick().await.unwrap();
    let first = h.store.racers().await;

    h.connector.set_races(vec![race(
        id,
        "alttpr",
        RaceStatus::Open,
        vec![entrant("ALICE", EntrantStatus::Entered)],
    )]);
    h.sync.tick().await.unwrap();
    let second = h.store.racers().await;

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].racer_id, first[0].racer_id);
    assert_eq!(second[0].display_name, "ALICE");
}

#[tokio::test]
async fn unknown_game_is_skipped() {
    let h = harness().await;
    h.connector.set_races(vec![
        race("mystery/odd-race-0001", "mystery", RaceStatus::Open, Vec::new()),
        race(
            "alttpr/lazy-bonk-0007",
            "alttpr",
            RaceStatus::Open,
            vec![entrant("Alice", EntrantStatus::Entered)],
        ),
    ]);

    let tick = h.sync.tick().await.unwrap();
    assert_eq!(tick.fetched, 2);
    assert_eq!(tick.skipped, 1);
    assert_eq!(tick.changed, 1);
    assert!(h
        .store
        .find_race(RTGG, "mystery/odd-race-0001")
        .await
        .unwrap()
        .is_none());
    assert_eq!(h.sink.count().await, 1);
}

#[tokio::test]
async fn provider_failure_aborts_tick_without_writes() {
    let h = harness().await;
    h.connector.set_races(vec![race(
        "alttpr/lazy-bonk-0008",
        "alttpr",
        RaceStatus::Open,
        vec![entrant("Alice", EntrantStatus::Entered)],
    )]);
    h.connector.set_failing(true);

    let err = h.sync.tick().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::ProviderFetch {
            connector: ConnectorId::RaceTimeGg,
            ..
        }
    ));
    assert!(h.store.races().await.is_empty());
    assert!(h.store.racers().await.is_empty());

    // the next tick recovers
    h.connector.set_failing(false);
    assert_eq!(h.sync.tick().await.unwrap().changed, 1);
}

#[tokio::test]
async fn vanished_races_are_left_alone() {
    let h = harness().await;
    let id = "alttpr/lazy-bonk-0009";
    h.connector.set_races(vec![race(
        id,
        "alttpr",
        RaceStatus::InProgress,
        vec![entrant("Alice", EntrantStatus::InProgress)],
    )]);
    h.sync.tick().await.unwrap();
    let before = h.race(id).await;

    h.connector.set_races(Vec::new());
    assert_eq!(h.sync.tick().await.unwrap(), report(0, 0, 0));
    assert_eq!(h.race(id).await, before);
    assert_eq!(h.entrants(id).await.len(), 1);
}

/// Fails every write for one race, passes everything else through.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    broken_race: &'static str,
}

#[async_trait]
impl EntityStore for FlakyStore {
    async fn find_game(&self, connector: ConnectorId, identifier: &str) -> StoreResult<Option<Game>> {
        self.inner.find_game(connector, identifier).await
    }

    async fn save_game(&self, game: NewGame) -> StoreResult<Game> {
        self.inner.save_game(game).await
    }

    async fn find_racer(&self, connector: ConnectorId, identifier: &str) -> StoreResult<Option<Racer>> {
        self.inner.find_racer(connector, identifier).await
    }

    async fn save_racer(&self, racer: NewRacer) -> StoreResult<Racer> {
        self.inner.save_racer(racer).await
    }

    async fn find_race(&self, connector: ConnectorId, identifier: &str) -> StoreResult<Option<Race>> {
        self.inner.find_race(connector, identifier).await
    }

    async fn save_race(&self, race: NewRace) -> StoreResult<Race> {
        if race.identifier == self.broken_race {
            return Err(StoreError::Backend("connection reset".into()));
        }
        self.inner.save_race(race).await
    }

    async fn find_entrants(&self, race_id: u32) -> StoreResult<Vec<EntrantDetail>> {
        self.inner.find_entrants(race_id).await
    }

    async fn save_entrant(&self, entrant: NewEntrant) -> StoreResult<Entrant> {
        self.inner.save_entrant(entrant).await
    }

    async fn delete_entrants(&self, race_id: u32, entrant_ids: &[u32]) -> StoreResult<usize> {
        self.inner.delete_entrants(race_id, entrant_ids).await
    }

    async fn find_channel(&self, identifier: &str) -> StoreResult<Option<Channel>> {
        self.inner.find_channel(identifier).await
    }

    async fn find_channels_by_server(&self, server_identifier: &str) -> StoreResult<Vec<Channel>> {
        self.inner.find_channels_by_server(server_identifier).await
    }

    async fn save_channel(&self, channel: NewChannel) -> StoreResult<Channel> {
        self.inner.save_channel(channel).await
    }

    async fn find_tracker(&self, channel_id: u32, game_id: u32) -> StoreResult<Option<Tracker>> {
        self.inner.find_tracker(channel_id, game_id).await
    }

    async fn find_tracker_by_id(&self, tracker_id: u32) -> StoreResult<Option<Tracker>> {
        self.inner.find_tracker_by_id(tracker_id).await
    }

    async fn find_trackers_by_channels(&self, channel_ids: &[u32]) -> StoreResult<Vec<Tracker>> {
        self.inner.find_trackers_by_channels(channel_ids).await
    }

    async fn find_trackers_by_game(&self, game_id: u32) -> StoreResult<Vec<Tracker>> {
        self.inner.find_trackers_by_game(game_id).await
    }

    async fn save_tracker(&self, tracker: NewTracker) -> StoreResult<Tracker> {
        self.inner.save_tracker(tracker).await
    }
}

#[tokio::test]
async fn failing_race_does_not_block_siblings() {
    let memory = Arc::new(MemoryStore::new());
    let flaky: Arc<dyn EntityStore> = Arc::new(FlakyStore {
        inner: Arc::clone(&memory),
        broken_race: "alttpr/broken-0001",
    });
    let h = harness_with(flaky, memory).await;
    h.connector.set_races(vec![
        race("alttpr/fine-0001", "alttpr", RaceStatus::Open, vec![entrant("Alice", EntrantStatus::Entered)]),
        race("alttpr/broken-0001", "alttpr", RaceStatus::Open, vec![entrant("Bob", EntrantStatus::Entered)]),
        race("smw/fine-0002", "smw", RaceStatus::Open, vec![entrant("Carol", EntrantStatus::Entered)]),
    ]);

    let tick = h.sync.tick().await.unwrap();
    assert_eq!(tick.fetched, 3);
    assert_eq!(tick.changed, 2);
    assert_eq!(tick.failed, 1);
    assert_eq!(h.store.races().await.len(), 2);
    assert_eq!(h.sink.count().await, 2);
}
