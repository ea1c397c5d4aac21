use std::{error::Error, sync::Arc};

use chrono::{offset::Utc, NaiveDateTime};
use uuid::Uuid;

pub type BoxedError = Box<dyn Error + Send + Sync>;

// every timestamp the sync jobs write goes through one of these so tests can
// step time deterministically
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[inline]
pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().naive_utc())
}

#[inline]
pub fn new_uuid() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

#[inline]
pub fn latest(a: NaiveDateTime, b: NaiveDateTime) -> NaiveDateTime {
    if b > a {
        b
    } else {
        a
    }
}
