use chrono::NaiveDateTime;

use crate::models::ConnectorId;

#[derive(Debug, Clone, PartialEq)]
pub struct Racer {
    pub racer_id: u32,
    pub identifier: String,
    pub connector: ConnectorId,
    pub display_name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRacer {
    pub identifier: String,
    pub connector: ConnectorId,
    pub display_name: String,
    pub updated_at: NaiveDateTime,
}

impl NewRacer {
    /// Racers are identified by their display name, case-insensitively. Two
    /// users whose names only differ in case end up as the same racer.
    #[inline]
    pub fn identifier_for(display_name: &str) -> String {
        display_name.to_lowercase()
    }

    pub fn merge(
        existing: Option<&Racer>,
        display_name: &str,
        connector: ConnectorId,
        now: NaiveDateTime,
    ) -> Self {
        let updated_at = match existing {
            Some(r) if r.display_name == display_name => r.updated_at,
            _ => now,
        };

        NewRacer {
            identifier: NewRacer::identifier_for(display_name),
            connector,
            display_name: display_name.to_owned(),
            updated_at,
        }
    }
}
