use chrono::NaiveDateTime;

use crate::helpers::new_uuid;

/// A chat channel race updates can be posted to. `server_identifier` is the
/// guild/server the channel lives in, when the chat platform has one.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub channel_id: u32,
    pub identifier: String,
    pub server_identifier: Option<String>,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChannel {
    pub identifier: String,
    pub server_identifier: Option<String>,
    pub name: String,
    pub updated_at: NaiveDateTime,
}

impl NewChannel {
    pub fn merge(
        existing: Option<&Channel>,
        identifier: &str,
        server_identifier: Option<&str>,
        name: &str,
        now: NaiveDateTime,
    ) -> Self {
        let server_identifier = server_identifier
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        let updated_at = match existing {
            Some(c) if c.name == name && c.server_identifier == server_identifier => c.updated_at,
            _ => now,
        };

        NewChannel {
            identifier: identifier.to_owned(),
            server_identifier,
            name: name.to_owned(),
            updated_at,
        }
    }
}

/// Maps a game to a channel its race updates get posted in.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracker {
    pub tracker_id: u32,
    pub identifier: String,
    pub channel_id: u32,
    pub game_id: u32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTracker {
    pub identifier: String,
    pub channel_id: u32,
    pub game_id: u32,
    pub is_active: bool,
    pub updated_at: NaiveDateTime,
}

impl NewTracker {
    pub fn activate(
        existing: Option<&Tracker>,
        channel_id: u32,
        game_id: u32,
        now: NaiveDateTime,
    ) -> Self {
        match existing {
            Some(t) => NewTracker {
                identifier: t.identifier.clone(),
                channel_id: t.channel_id,
                game_id: t.game_id,
                is_active: true,
                updated_at: if t.is_active { t.updated_at } else { now },
            },
            None => NewTracker {
                identifier: new_uuid(),
                channel_id,
                game_id,
                is_active: true,
                updated_at: now,
            },
        }
    }

    pub fn deactivate(tracker: &Tracker, now: NaiveDateTime) -> Self {
        NewTracker {
            identifier: tracker.identifier.clone(),
            channel_id: tracker.channel_id,
            game_id: tracker.game_id,
            is_active: false,
            updated_at: if tracker.is_active { now } else { tracker.updated_at },
        }
    }
}
