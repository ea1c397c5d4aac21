use chrono::NaiveDateTime;

use crate::{connectors::GameSnapshot, models::ConnectorId};

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub game_id: u32,
    pub identifier: String,
    pub connector: ConnectorId,
    pub name: String,
    pub image_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Upsert payload for a game, keyed by (identifier, connector).
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub identifier: String,
    pub connector: ConnectorId,
    pub name: String,
    pub image_url: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl NewGame {
    /// Name and image always come from the snapshot. The modification marker
    /// only moves when one of them differs from what we have stored.
    pub fn merge(
        existing: Option<&Game>,
        snapshot: &GameSnapshot,
        connector: ConnectorId,
        now: NaiveDateTime,
    ) -> Self {
        let mut merged = NewGame {
            identifier: snapshot.identifier.clone(),
            connector,
            name: snapshot.name.clone(),
            image_url: snapshot.image_url.clone(),
            updated_at: now,
        };
        if let Some(game) = existing {
            merged.identifier = game.identifier.clone();
            merged.connector = game.connector;
            if game.name == merged.name && game.image_url == merged.image_url {
                merged.updated_at = game.updated_at;
            }
        }

        merged
    }
}
