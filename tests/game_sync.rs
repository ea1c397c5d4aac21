mod common;

use std::sync::Arc;

use common::{game, step_clock, ScriptedConnector};
use race_announcer::{
    connectors::GameSnapshot,
    error::SyncError,
    models::ConnectorId,
    store::{EntityStore, MemoryStore},
    sync::{CatalogTickReport, GameCatalogSync},
};

fn catalog(connector: &Arc<ScriptedConnector>, store: &Arc<MemoryStore>) -> GameCatalogSync {
    GameCatalogSync::new(connector.clone(), store.clone()).with_clock(step_clock())
}

#[tokio::test]
async fn catalog_is_upserted_in_place() {
    let connector = ScriptedConnector::new(ConnectorId::SpeedRunsLive);
    let store = Arc::new(MemoryStore::new());
    let sync = catalog(&connector, &store);

    connector.set_games(vec![
        game("alttp", "The Legend of Zelda: A Link to the Past"),
        game("smw", "Super Mario World"),
    ]);
    assert_eq!(
        sync.tick().await.unwrap(),
        CatalogTickReport {
            fetched: 2,
            updated: 2,
            failed: 0
        }
    );
    let before = store
        .find_game(ConnectorId::SpeedRunsLive, "smw")
        .await
        .unwrap()
        .unwrap();

    connector.set_games(vec![
        game("alttp", "The Legend of Zelda: A Link to the Past"),
        GameSnapshot {
            identifier: "smw".to_owned(),
            name: "Super Mario World (SNES)".to_owned(),
            image_url: Some("https://example.org/smw.png".to_owned()),
        },
    ]);
    assert_eq!(sync.tick().await.unwrap().updated, 1);

    let after = store
        .find_game(ConnectorId::SpeedRunsLive, "smw")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.game_id, before.game_id);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.name, "Super Mario World (SNES)");
    assert_eq!(after.image_url.as_deref(), Some("https://example.org/smw.png"));
    assert!(after.updated_at > before.updated_at);
    assert_eq!(store.games().await.len(), 2);
}

#[tokio::test]
async fn games_missing_from_catalog_are_kept() {
    let connector = ScriptedConnector::new(ConnectorId::RaceTimeGg);
    let store = Arc::new(MemoryStore::new());
    let sync = catalog(&connector, &store);

    connector.set_games(vec![game("alttpr", "ALttPR"), game("ootr", "OoTR")]);
    sync.tick().await.unwrap();
    connector.set_games(vec![game("ootr", "OoTR")]);
    let report = sync.tick().await.unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(store.games().await.len(), 2);
}

#[tokio::test]
async fn fetch_failure_fails_the_tick() {
    let connector = ScriptedConnector::new(ConnectorId::RaceTimeGg);
    let store = Arc::new(MemoryStore::new());
    let sync = catalog(&connector, &store);

    connector.set_games(vec![game("alttpr", "ALttPR")]);
    connector.set_failing(true);
    assert!(matches!(
        sync.tick().await,
        Err(SyncError::ProviderFetch { .. })
    ));
    assert!(store.games().await.is_empty());
}

#[tokio::test]
async fn same_identifier_on_two_connectors_is_two_games() {
    let store = Arc::new(MemoryStore::new());
    for id in [ConnectorId::RaceTimeGg, ConnectorId::SpeedRunsLive] {
        let connector = ScriptedConnector::new(id);
        connector.set_games(vec![game("smw", "Super Mario World")]);
        catalog(&connector, &store).tick().await.unwrap();
    }

    let games = store.games().await;
    assert_eq!(games.len(), 2);
    assert_ne!(games[0].game_id, games[1].game_id);
}
