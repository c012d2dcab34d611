use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds since the epoch, the resolution the monitoring agent expects.
pub fn unix_seconds(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::unix_seconds;

    #[test]
    fn unix_seconds_drops_subsecond_precision() {
        let dt = Utc.timestamp_millis_opt(1_700_000_000_999).unwrap();
        assert_eq!(unix_seconds(&dt), 1_700_000_000);
    }
}
