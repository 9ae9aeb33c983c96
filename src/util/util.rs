use std::future::Future;
use std::time::{Duration, SystemTime};
use tracing::info;

/// Run an async operation and log how long it took.
///
/// The optional `trace_log_fn` renders a short description of a successful
/// result for the log line.
pub async fn measure_dur_async<F, Fut, T, E>(
    metric_name: &str,
    operation: F,
    trace_log_fn: Option<fn(&T) -> String>,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = SystemTime::now();
    let result = operation().await;
    let dur = start.elapsed().unwrap_or_else(|_| Duration::from_millis(0));
    let log_line = result
        .as_ref()
        .ok()
        .and_then(|r| trace_log_fn.map(|f| f(r)))
        .unwrap_or_default();
    info!("{} | {}, took={}", metric_name, log_line, dur.as_millis());
    result
}

/// Timestamp tick count of 1970-01-01T00:00:00Z.
///
/// A tick is 100 nanoseconds counted from 0001-01-01T00:00:00Z.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert a UTC timestamp to ticks, `None` when the tick count does not
/// fit in an `i64` (roughly past year 29000).
pub fn to_ticks(timestamp: chrono::DateTime<chrono::Utc>) -> Option<i64> {
    timestamp
        .timestamp()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(i64::from(timestamp.timestamp_subsec_nanos() / 100))?
        .checked_add(UNIX_EPOCH_TICKS)
}

/// Convert ticks back to a UTC timestamp, `None` when out of range.
pub fn from_ticks(ticks: i64) -> Option<chrono::DateTime<chrono::Utc>> {
    let since_epoch = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    chrono::DateTime::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_unix_epoch_ticks() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(to_ticks(epoch), Some(UNIX_EPOCH_TICKS));
        assert_eq!(from_ticks(UNIX_EPOCH_TICKS), Some(epoch));
    }

    #[test]
    fn test_known_tick_value() {
        // 2024-01-01T00:00:00Z
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_ticks(ts), Some(638_396_640_000_000_000));
    }

    #[test]
    fn test_ticks_keep_sub_second_precision() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_700).unwrap();
        assert_eq!(to_ticks(ts).and_then(from_ticks), Some(ts));
    }

    #[test]
    fn test_ticks_before_unix_epoch() {
        let ts = Utc.with_ymd_and_hms(1900, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(to_ticks(ts).and_then(from_ticks), Some(ts));
    }

    #[test]
    fn test_to_ticks_overflow() {
        assert_eq!(to_ticks(chrono::DateTime::<Utc>::MAX_UTC), None);
        assert_eq!(to_ticks(chrono::DateTime::<Utc>::MIN_UTC), None);
    }

    #[test]
    fn test_from_ticks_out_of_range() {
        assert_eq!(from_ticks(i64::MIN), None);
    }

    fn describe(n: &usize) -> String {
        format!("count={}", n)
    }

    #[tokio::test]
    async fn test_measure_dur_async_passes_result_through() {
        let ok: Result<usize, String> =
            measure_dur_async("count_things", || async { Ok(3) }, Some(describe)).await;
        assert_eq!(ok, Ok(3));

        let err: Result<usize, String> =
            measure_dur_async("count_things", || async { Err("boom".to_string()) }, None).await;
        assert_eq!(err, Err("boom".to_string()));
    }
}
