use std::{convert::TryFrom, fmt, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;

// a year; anything longer is a typo and would overflow tokio's Instant
const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 3600);

/// How often a sync job ticks. Written in config either as a number of
/// seconds or as a string like `500ms`, `10s`, `5m` or `1h`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ScheduleValue")]
pub struct SyncSchedule(Duration);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScheduleValue {
    Seconds(u64),
    Text(String),
}

impl SyncSchedule {
    pub fn every(period: Duration) -> Result<Self, ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::Invalid(
                "sync interval must be longer than zero".to_owned(),
            ));
        }
        if period > MAX_PERIOD {
            return Err(ConfigError::Invalid(format!(
                "sync interval of {}s is longer than a year",
                period.as_secs()
            )));
        }

        Ok(SyncSchedule(period))
    }

    // compile-time defaults only
    pub(crate) fn seconds(secs: u64) -> Self {
        debug_assert!(secs > 0 && Duration::from_secs(secs) <= MAX_PERIOD);
        SyncSchedule(Duration::from_secs(secs))
    }

    pub fn period(&self) -> Duration {
        self.0
    }
}

impl FromStr for SyncSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or_else(|| s.len());
        let (amount, unit) = s.split_at(split);
        let amount: u64 = amount
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad sync interval \"{}\"", s)))?;
        let too_long = || ConfigError::Invalid(format!("sync interval \"{}\" is too long", s));
        let period = match unit.trim() {
            "ms" => Duration::from_millis(amount),
            "" | "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.checked_mul(60).ok_or_else(too_long)?),
            "h" => Duration::from_secs(amount.checked_mul(3600).ok_or_else(too_long)?),
            x => {
                return Err(ConfigError::Invalid(format!(
                    "unknown sync interval unit \"{}\"",
                    x
                )))
            }
        };

        SyncSchedule::every(period)
    }
}

impl TryFrom<ScheduleValue> for SyncSchedule {
    type Error = ConfigError;

    fn try_from(value: ScheduleValue) -> Result<Self, Self::Error> {
        match value {
            ScheduleValue::Seconds(s) => SyncSchedule::every(Duration::from_secs(s)),
            ScheduleValue::Text(t) => t.parse(),
        }
    }
}

impl fmt::Display for SyncSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        if millis % 1000 != 0 {
            write!(f, "{}ms", millis)
        } else {
            write!(f, "{}s", self.0.as_secs())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units() {
        let parse = |s: &str| s.parse::<SyncSchedule>().unwrap().period();
        assert_eq!(parse("10"), Duration::from_secs(10));
        assert_eq!(parse("10s"), Duration::from_secs(10));
        assert_eq!(parse("500ms"), Duration::from_millis(500));
        assert_eq!(parse("5m"), Duration::from_secs(300));
        assert_eq!(parse(" 1h "), Duration::from_secs(3600));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!("0s".parse::<SyncSchedule>().is_err());
        assert!("*/10 * * * * *".parse::<SyncSchedule>().is_err());
        assert!("10d".parse::<SyncSchedule>().is_err());
        assert!("".parse::<SyncSchedule>().is_err());
    }

    #[test]
    fn rejects_overflowing_and_overlong_periods() {
        assert!("5124095576030432h".parse::<SyncSchedule>().is_err());
        assert!("307445734561825861m".parse::<SyncSchedule>().is_err());
        assert!("18446744073709551615".parse::<SyncSchedule>().is_err());
        assert!("8761h".parse::<SyncSchedule>().is_err());
        assert_eq!(
            "8760h".parse::<SyncSchedule>().unwrap().period(),
            Duration::from_secs(365 * 24 * 3600)
        );
        assert!(SyncSchedule::every(Duration::from_secs(u64::MAX)).is_err());
    }

    #[test]
    fn displays_compactly() {
        assert_eq!(SyncSchedule::every(Duration::from_secs(30)).unwrap().to_string(), "30s");
        assert_eq!(
            SyncSchedule::every(Duration::from_millis(1500)).unwrap().to_string(),
            "1500ms"
        );
    }
}
