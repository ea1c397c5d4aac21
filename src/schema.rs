table! {
    channels (channel_id) {
        channel_id -> Unsigned<Integer>,
        identifier -> Varchar,
        server_identifier -> Nullable<Varchar>,
        name -> Varchar,
        created_at -> Datetime,
        updated_at -> Datetime,
    }
}

table! {
    entrants (entrant_id) {
        entrant_id -> Unsigned<Integer>,
        race_id -> Unsigned<Integer>,
        racer_id -> Unsigned<Integer>,
        status -> Varchar,
        final_time -> Nullable<Unsigned<Integer>>,
        place -> Nullable<Unsigned<Integer>>,
        created_at -> Datetime,
        updated_at -> Datetime,
    }
}

table! {
    games (game_id) {
        game_id -> Unsigned<Integer>,
        identifier -> Varchar,
        connector -> Varchar,
        name -> Varchar,
        image_url -> Nullable<Varchar>,
        created_at -> Datetime,
        updated_at -> Datetime,
    }
}

table! {
    racers (racer_id) {
        racer_id -> Unsigned<Integer>,
        identifier -> Varchar,
        connector -> Varchar,
        display_name -> Varchar,
        created_at -> Datetime,
        updated_at -> Datetime,
    }
}

table! {
    races (race_id) {
        race_id -> Unsigned<Integer>,
        identifier -> Varchar,
        connector -> Varchar,
        game_id -> Unsigned<Integer>,
        goal -> Varchar,
        status -> Varchar,
        last_sync_at -> Datetime,
        last_change_at -> Datetime,
        created_at -> Datetime,
        updated_at -> Datetime,
    }
}

table! {
    trackers (tracker_id) {
        tracker_id -> Unsigned<Integer>,
        identifier -> Varchar,
        channel_id -> Unsigned<Integer>,
        game_id -> Unsigned<Integer>,
        is_active -> Bool,
        created_at -> Datetime,
        updated_at -> Datetime,
    }
}

joinable!(entrants -> racers (racer_id));
joinable!(entrants -> races (race_id));
joinable!(races -> games (game_id));
joinable!(trackers -> channels (channel_id));
joinable!(trackers -> games (game_id));

allow_tables_to_appear_in_same_query!(
    channels,
    entrants,
    games,
    racers,
    races,
    trackers,
);
